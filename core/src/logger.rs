//! Global logging system for Keel
//!
//! Fixed-size ring of formatted entries. Formatting happens into a stack
//! buffer so logging never allocates; overlong messages are truncated.

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use spin::Mutex;

/// Entries the ring retains
pub const MAX_LOG_ENTRIES: usize = 64;
/// Bytes kept per message
pub const MAX_MESSAGE_LEN: usize = 120;

/// Severity, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// The boot cannot go on
    Error,
    /// Something was skipped
    Warn,
    /// Progress
    Info,
    /// Detail for debugging the loader
    Debug,
}

impl Level {
    /// Tag printed in front of a message
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        }
    }
}

/// One retained message
#[derive(Clone, Copy)]
pub struct Entry {
    level: Level,
    len: usize,
    text: [u8; MAX_MESSAGE_LEN],
}

impl Entry {
    const EMPTY: Entry = Entry {
        level: Level::Debug,
        len: 0,
        text: [0; MAX_MESSAGE_LEN],
    };

    /// Severity the entry was logged at
    pub fn level(&self) -> Level {
        self.level
    }

    /// Message text, possibly truncated
    pub fn message(&self) -> &str {
        // Only whole characters are ever copied in
        core::str::from_utf8(&self.text[..self.len]).unwrap_or("")
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level.as_str(), self.message())
    }
}

// fmt::Write into a fixed buffer, dropping whatever does not fit
struct Truncating<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.buf.len() - self.len;
        let mut take = s.len().min(room);
        while !s.is_char_boundary(take) {
            take -= 1;
        }
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

struct Ring {
    entries: [Entry; MAX_LOG_ENTRIES],
    next: usize,
    stored: usize,
}

impl Ring {
    const fn new() -> Self {
        Self {
            entries: [Entry::EMPTY; MAX_LOG_ENTRIES],
            next: 0,
            stored: 0,
        }
    }

    fn push(&mut self, entry: Entry) {
        self.entries[self.next] = entry;
        self.next = (self.next + 1) % MAX_LOG_ENTRIES;
        self.stored = (self.stored + 1).min(MAX_LOG_ENTRIES);
    }

    fn oldest(&self) -> usize {
        (self.next + MAX_LOG_ENTRIES - self.stored) % MAX_LOG_ENTRIES
    }
}

/// Console mirror for log entries
pub type Sink = fn(Level, &str);

/// Ring buffer logger with an optional console sink
pub struct Logger {
    ring: Mutex<Ring>,
    sink: Mutex<Option<Sink>>,
    total: AtomicUsize,
    frozen: AtomicBool,
}

impl Logger {
    /// Empty, unfrozen logger without a sink
    pub const fn new() -> Self {
        Self {
            ring: Mutex::new(Ring::new()),
            sink: Mutex::new(None),
            total: AtomicUsize::new(0),
            frozen: AtomicBool::new(false),
        }
    }

    /// Format and store one message, then mirror it to the sink
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if self.frozen.load(Ordering::SeqCst) {
            return;
        }

        let mut entry = Entry::EMPTY;
        entry.level = level;
        let mut writer = Truncating {
            buf: &mut entry.text,
            len: 0,
        };
        let _ = writer.write_fmt(args);
        entry.len = writer.len;

        self.ring.lock().push(entry);
        self.total.fetch_add(1, Ordering::SeqCst);

        let sink = *self.sink.lock();
        if let Some(sink) = sink {
            sink(level, entry.message());
        }
    }

    /// Mirror every later message to `sink`
    pub fn set_sink(&self, sink: Sink) {
        *self.sink.lock() = Some(sink);
    }

    /// Drop every later message. Used once firmware services are going away.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    /// Messages logged so far, including ones the ring has overwritten
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Visit retained entries, oldest first
    pub fn for_each<F: FnMut(&Entry)>(&self, mut f: F) {
        let ring = self.ring.lock();
        let start = ring.oldest();
        for i in 0..ring.stored {
            f(&ring.entries[(start + i) % MAX_LOG_ENTRIES]);
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// The loader-wide logger behind the `log_*` macros
pub static LOGGER: Logger = Logger::new();

/// Log to [`LOGGER`]
pub fn log(level: Level, args: fmt::Arguments<'_>) {
    LOGGER.log(level, args);
}

/// Set the console sink of [`LOGGER`]
pub fn set_sink(sink: Sink) {
    LOGGER.set_sink(sink);
}

/// Stop [`LOGGER`] from taking messages
pub fn freeze() {
    LOGGER.freeze();
}

/// Trace entry point for the block and filesystem crates (`trace` feature)
///
/// # Safety
/// `msg` must point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn keel_log(msg: *const u8, len: usize) {
    if msg.is_null() {
        return;
    }
    let bytes = core::slice::from_raw_parts(msg, len);
    if let Ok(text) = core::str::from_utf8(bytes) {
        log(Level::Debug, format_args!("{}", text));
    }
}

/// Log at error level
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Error, format_args!($($arg)*))
    };
}

/// Log at warning level
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Warn, format_args!($($arg)*))
    };
}

/// Log at info level
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Info, format_args!($($arg)*))
    };
}

/// Log at debug level
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Debug, format_args!($($arg)*))
    };
}
