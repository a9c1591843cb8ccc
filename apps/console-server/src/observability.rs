// [[AGENTDECK]]/apps/console-server/src/observability.rs
// Purpose: Tracing setup for the console server.
// Architecture: Cross-cutting
// Dependencies: tracing-subscriber

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "agentdeck_console=debug,tower_http=trace";

/// `RUST_LOG` wins when set; otherwise the crate logs at debug and HTTP traces are on.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
