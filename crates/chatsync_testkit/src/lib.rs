//! # Chatsync Testkit
//!
//! Shared test tooling for chatsync:
//! - Store fixtures and mutation builders
//! - Property-based test generators using proptest
//! - Test logging setup

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use fixtures::{initial_message, initial_room, initial_user, seeded_store, TestStore};

/// Installs a per-test tracing subscriber honoring `RUST_LOG`.
///
/// Safe to call from every test; only the first call in a process takes
/// effect.
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
