pub mod mock_store;

/// Installs a `tracing-subscriber` `fmt` layer gated by `RUST_LOG`, the same one-liner the
/// teacher leaves commented at the top of its own `disk_v2/tests/mod.rs` for manually chasing
/// down a test failure. `try_init` rather than `init`, since more than one test in this binary
/// may call it and only the first call should win.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
