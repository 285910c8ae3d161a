#[cfg(feature = "trace")]
extern "C" {
    fn keel_log(msg: *const u8, len: usize);
}

#[cfg(feature = "trace")]
pub(crate) fn trace(msg: &str) {
    unsafe { keel_log(msg.as_ptr(), msg.len()) };
}

#[cfg(not(feature = "trace"))]
pub(crate) fn trace(_msg: &str) {}
