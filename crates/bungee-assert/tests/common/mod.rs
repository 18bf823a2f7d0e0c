//! Shared helpers for the subprocess-driven integration tests.
//!
//! Fatal scenarios cannot run inside the test process, so each test binary
//! re-executes itself with `BUNGEE_TEST_SCENARIO` set. The `scenario_driver`
//! test in that binary picks the variable up and runs the scenario; the
//! parent inspects how the child ended and what it wrote to stderr.

#![allow(dead_code)]

use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, Output, Stdio};

pub const SCENARIO_VAR: &str = "BUNGEE_TEST_SCENARIO";

/// The scenario this process was asked to run, if any.
pub fn requested_scenario() -> Option<String> {
    std::env::var(SCENARIO_VAR).ok()
}

/// Build a command that re-runs this test binary's `scenario_driver`.
pub fn scenario_command(scenario: &str) -> Command {
    let exe = std::env::current_exe().expect("cannot determine test binary path");
    let mut cmd = Command::new(exe);
    cmd.env(SCENARIO_VAR, scenario)
        .env_remove("BUNGEE_FP_TRAPS")
        .arg("--exact")
        .arg("scenario_driver")
        .arg("--nocapture")
        .arg("--test-threads=1");
    cmd
}

pub fn run_scenario(scenario: &str, envs: &[(&str, &str)]) -> Output {
    let mut cmd = scenario_command(scenario);
    for (key, val) in envs {
        cmd.env(key, val);
    }
    cmd.output().expect("failed to spawn subprocess")
}

/// Spawn a scenario with stderr piped, leaving the child for the caller to
/// wait on.
pub fn spawn_scenario(scenario: &str) -> Child {
    scenario_command(scenario)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn subprocess")
}

/// Lines of `output.stderr` that start with `prefix`.
pub fn stderr_lines(output: &Output, prefix: &str) -> Vec<String> {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .filter(|l| l.starts_with(prefix))
        .map(str::to_owned)
        .collect()
}

/// Assert that the child was killed by `signal` and wrote `expected_line`
/// (without its newline) exactly once among its `Failed:` lines.
pub fn expect_failure(output: &Output, signal: libc::c_int, expected_line: &str) {
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        output.status.signal(),
        Some(signal),
        "expected death by signal {}, got {:?}. stderr:\n{}",
        signal,
        output.status,
        stderr
    );
    assert_eq!(
        stderr_lines(output, "Failed:"),
        vec![expected_line.to_owned()],
        "unexpected diagnostics. Full stderr:\n{}",
        stderr
    );
    assert!(
        stderr.contains(&format!("{}\n", expected_line)),
        "diagnostic not newline-terminated"
    );
}

/// Put the fatal signals back to their default action.
///
/// With the `petrify` feature the load-time constructor installs the freeze
/// handler in every test binary; scenarios that expect the process to die
/// must undo that first or the parent would wait forever.
pub fn default_fatal_signals() {
    for sig in [libc::SIGSEGV, libc::SIGABRT, libc::SIGILL, libc::SIGFPE] {
        unsafe {
            libc::signal(sig, libc::SIG_DFL);
        }
    }
}

/// Stand-in host hook for `external-fail` builds. Leaves its own
/// `host hook:` line before the usual diagnostic, so tests can tell the hook
/// was reached.
#[cfg(feature = "external-fail")]
#[no_mangle]
pub fn bungee_assert_fail(level: i32, message: &str, file: &str, line: u32) -> ! {
    use bungee_assert::{AbortReporter, FailureReporter, Location};
    eprintln!("host hook: L{} {} at {}:{}", level, message, file, line);
    AbortReporter::report_failure(level, message, Location { file, line })
}
