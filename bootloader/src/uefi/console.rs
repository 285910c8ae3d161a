//! ConOut mirror for the core log

use super::SimpleTextOutputProtocol;
use core::sync::atomic::{AtomicPtr, Ordering};
use keel_core::logger::{self, Level};

static CON_OUT: AtomicPtr<SimpleTextOutputProtocol> = AtomicPtr::new(core::ptr::null_mut());

/// UCS-2 characters per `OutputString` call, NUL excluded
const CHUNK: usize = 127;

/// Install the console as the log sink
pub fn install(con_out: *mut SimpleTextOutputProtocol) {
    CON_OUT.store(con_out, Ordering::SeqCst);
    logger::set_sink(sink);
}

/// Print a line directly
pub fn println(text: &str) {
    write(text);
    write("\r\n");
}

fn sink(level: Level, message: &str) {
    write("[");
    write(level.as_str());
    write("] ");
    println(message);
}

fn write(text: &str) {
    let con_out = CON_OUT.load(Ordering::SeqCst);
    if con_out.is_null() {
        return;
    }

    let mut buf = [0u16; CHUNK + 1];
    let mut len = 0;
    for c in text.chars() {
        buf[len] = if (c as u32) < 0x10000 { c as u16 } else { b'?' as u16 };
        len += 1;
        if len == CHUNK {
            flush(con_out, &mut buf, len);
            len = 0;
        }
    }
    if len > 0 {
        flush(con_out, &mut buf, len);
    }
}

fn flush(con_out: *mut SimpleTextOutputProtocol, buf: &mut [u16], len: usize) {
    buf[len] = 0;
    // SAFETY: con_out came from the system table and boot services are active
    // until the logger is frozen
    unsafe {
        ((*con_out).output_string)(con_out, buf.as_ptr());
    }
}
