//! Assertion reporter: literal diagnostic line, then SIGABRT.

#![cfg(unix)]

mod common;

use bungee_assert::{AbortReporter, FailureReporter, Location};
use common::{default_fatal_signals, expect_failure, requested_scenario, run_scenario};

#[test]
fn scenario_driver() {
    let Some(scenario) = requested_scenario() else {
        return;
    };
    default_fatal_signals();

    match scenario.as_str() {
        "abort_reporter" => AbortReporter::report_failure(
            2,
            "ratio <= 1.0",
            Location {
                file: "src/stretcher.rs",
                line: 218,
            },
        ),
        "fail" => bungee_assert::fail(1, "success", "src/Assert.rs", 27),
        "assert1" => {
            let frames = std::hint::black_box(0usize);
            bungee_assert::bungee_assert1!(frames > 0);
        }
        "assert2" => {
            bungee_assert::bungee_assert2!(std::hint::black_box(false));
        }
        _ => panic!("unknown scenario: {}", scenario),
    }
}

#[test]
fn abort_reporter_writes_line_and_aborts() {
    let output = run_scenario("abort_reporter", &[]);
    expect_failure(
        &output,
        libc::SIGABRT,
        "Failed: BUNGEE_ASSERT2(ratio <= 1.0)  at (src/stretcher.rs: 218)",
    );
}

#[test]
#[cfg(not(feature = "external-fail"))]
fn fail_uses_abort_reporter_by_default() {
    let output = run_scenario("fail", &[]);
    expect_failure(
        &output,
        libc::SIGABRT,
        "Failed: BUNGEE_ASSERT1(success)  at (src/Assert.rs: 27)",
    );
}

#[test]
#[cfg(feature = "external-fail")]
fn fail_reaches_host_hook() {
    let output = run_scenario("fail", &[]);
    assert_eq!(
        common::stderr_lines(&output, "host hook:"),
        vec!["host hook: L1 success at src/Assert.rs:27".to_owned()],
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    expect_failure(
        &output,
        libc::SIGABRT,
        "Failed: BUNGEE_ASSERT1(success)  at (src/Assert.rs: 27)",
    );
}

#[test]
#[cfg(feature = "self-test")]
fn level1_macro_reports_call_site() {
    let output = run_scenario("assert1", &[]);
    let line = format!(
        "Failed: BUNGEE_ASSERT1(frames > 0)  at ({}: ",
        file!()
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains(&line), "missing {:?} in:\n{}", line, stderr);
}

#[test]
#[cfg(not(feature = "self-test"))]
fn level1_macro_inert_without_self_test() {
    let output = run_scenario("assert1", &[]);
    assert!(output.status.success(), "{:?}", output);
    assert!(common::stderr_lines(&output, "Failed:").is_empty());
}

#[test]
fn level2_macro_follows_thorough_feature() {
    let output = run_scenario("assert2", &[]);
    if cfg!(feature = "self-test-thorough") {
        assert!(!output.status.success());
        assert_eq!(
            common::stderr_lines(&output, "Failed:").len(),
            1,
            "{}",
            String::from_utf8_lossy(&output.stderr)
        );
    } else {
        assert!(output.status.success(), "{:?}", output);
    }
}
