//! Tracing setup: a single `init` callers can invoke once at process
//! startup. The engine itself only ever emits through `tracing`'s
//! global dispatcher — it never owns or assumes a particular subscriber.
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber honoring `RUST_LOG` (default `info`).
/// Idempotent: a second call after a subscriber is already set is a
/// harmless no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
