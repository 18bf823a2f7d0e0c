//! Assertion-failure reporting.
//!
//! Every detected contract violation ends here. The default reporter writes a
//! single diagnostic line straight to fd 2 and aborts; hosts may substitute
//! their own [`FailureReporter`], either per guard (generic parameter) or
//! crate-wide at link time with the `external-fail` feature.

use crate::util::{self, LineBuf};
use core::fmt::Write;

/// Longest diagnostic line emitted; longer messages are cut short.
pub const MAX_LINE: usize = 1024;

/// Where an assertion lives in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location<'a> {
    pub file: &'a str,
    pub line: u32,
}

/// Terminal handler for a failed assertion.
///
/// Implementations must not return and must not assert. They may run in an
/// already-corrupted process, so they should avoid allocating.
pub trait FailureReporter {
    fn report_failure(level: i32, message: &str, location: Location<'_>) -> !;
}

/// Writes `Failed: BUNGEE_ASSERT<level>(<message>)  at (<file>: <line>)` to
/// stderr and aborts.
pub struct AbortReporter;

impl FailureReporter for AbortReporter {
    #[cold]
    #[inline(never)]
    fn report_failure(level: i32, message: &str, location: Location<'_>) -> ! {
        let line = format_failure(level, message, location);
        util::write_all_raw(util::STDERR, line.as_bytes());
        unsafe { libc::abort() }
    }
}

#[cfg(feature = "external-fail")]
extern "Rust" {
    /// Provided by the host when built with `external-fail`:
    ///
    /// ```rust,ignore
    /// #[no_mangle]
    /// pub fn bungee_assert_fail(level: i32, message: &str, file: &str, line: u32) -> ! {
    ///     /* report, then terminate */
    /// }
    /// ```
    fn bungee_assert_fail(level: i32, message: &str, file: &str, line: u32) -> !;
}

/// Forwards to the host's `bungee_assert_fail`.
#[cfg(feature = "external-fail")]
pub struct ExternalReporter;

#[cfg(feature = "external-fail")]
impl FailureReporter for ExternalReporter {
    #[cold]
    #[inline(never)]
    fn report_failure(level: i32, message: &str, location: Location<'_>) -> ! {
        unsafe { bungee_assert_fail(level, message, location.file, location.line) }
    }
}

#[cfg(not(feature = "external-fail"))]
pub type DefaultReporter = AbortReporter;
#[cfg(feature = "external-fail")]
pub type DefaultReporter = ExternalReporter;

/// Report a failed assertion through the build's [`DefaultReporter`].
#[cold]
#[inline(never)]
pub fn fail(level: i32, message: &str, file: &str, line: u32) -> ! {
    DefaultReporter::report_failure(level, message, Location { file, line })
}

/// Render the diagnostic line, newline included, into a stack buffer.
pub fn format_failure(level: i32, message: &str, location: Location<'_>) -> LineBuf<MAX_LINE> {
    let mut line = LineBuf::new();
    // LineBuf never reports an error; it truncates instead.
    let _ = writeln!(
        line,
        "Failed: BUNGEE_ASSERT{}({})  at ({}: {})",
        level, message, location.file, location.line
    );
    line.finish();
    line
}
