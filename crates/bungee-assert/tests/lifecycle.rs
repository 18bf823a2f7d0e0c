//! Process lifecycle: the load-time constructor leaves `init()` to the host.

#![cfg(unix)]

// Supplies the `external-fail` hook this binary links against.
mod common;

use bungee_assert::init;

#[test]
fn init_stays_explicit_after_load() {
    assert!(!init::is_initialized(), "constructor must not run init()");
    init::init();
    assert!(init::is_initialized());
    init::init();
    assert!(init::is_initialized());
}
