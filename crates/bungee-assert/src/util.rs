use core::fmt;

/// Standard error file descriptor.
pub const STDERR: libc::c_int = libc::STDERR_FILENO;

/// Write all of `bytes` to `fd` with raw `write(2)` calls.
///
/// Async-signal-safe: no allocation, no locks, no stdio buffering. Gives up
/// silently on any error other than EINTR; there is nowhere left to report it.
pub fn write_all_raw(fd: libc::c_int, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        let n = unsafe { libc::write(fd, bytes.as_ptr() as *const libc::c_void, bytes.len()) };
        if n < 0 {
            if std::io::Error::last_os_error().raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return;
        }
        if n == 0 {
            return;
        }
        bytes = &bytes[n as usize..];
    }
}

#[cfg(any(target_os = "linux", target_os = "emscripten", target_os = "redox"))]
unsafe fn errno_location() -> *mut libc::c_int {
    libc::__errno_location()
}

#[cfg(any(target_os = "android", target_os = "netbsd", target_os = "openbsd"))]
unsafe fn errno_location() -> *mut libc::c_int {
    libc::__errno()
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
unsafe fn errno_location() -> *mut libc::c_int {
    libc::__error()
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "emscripten",
    target_os = "redox",
    target_os = "android",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
)))]
unsafe fn errno_location() -> *mut libc::c_int {
    core::ptr::null_mut()
}

/// The calling thread's `errno`, put back when this is dropped.
///
/// Async-signal-safe. A handler that may be resumed holds one for its whole
/// body so the interrupted code sees its own `errno`.
pub struct SavedErrno(libc::c_int);

impl SavedErrno {
    pub fn save() -> Self {
        let p = unsafe { errno_location() };
        Self(if p.is_null() { 0 } else { unsafe { *p } })
    }
}

impl Drop for SavedErrno {
    fn drop(&mut self) {
        let p = unsafe { errno_location() };
        if !p.is_null() {
            unsafe { *p = self.0 };
        }
    }
}

/// Fixed-capacity line buffer on the stack for `core::fmt` output.
///
/// Never allocates and never fails: text past the capacity is dropped, and
/// the last byte is forced to `\n` so a truncated line is still a line.
pub struct LineBuf<const N: usize> {
    buf: [u8; N],
    len: usize,
    truncated: bool,
}

impl<const N: usize> LineBuf<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0u8; N],
            len: 0,
            truncated: false,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Make a truncated line end in `\n` again.
    pub fn finish(&mut self) {
        if self.truncated && N > 0 {
            self.buf[N - 1] = b'\n';
        }
    }
}

impl<const N: usize> fmt::Write for LineBuf<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = N - self.len;
        let take = s.len().min(room);
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        if take < s.len() {
            self.truncated = true;
        }
        Ok(())
    }
}
