use std::net::SocketAddr;
use std::sync::Once;
use std::time::Duration;

/// Deadline applied to each store call unless configured otherwise.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(5000);

pub const DEFAULT_DATABASE: &str = "ledger.db";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Settings for the HTTP server, assembled from CLI flags and environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database: String,
    pub bind: SocketAddr,
    pub store_timeout: Duration,
}

impl ServerConfig {
    pub fn new(database: impl Into<String>, bind: SocketAddr) -> Self {
        Self {
            database: database.into(),
            bind,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }
}

static TRACING_INIT: Once = Once::new();

/// Install the global tracing subscriber. `RUST_LOG` takes precedence over the
/// crate default, which is `info` or `debug` when `verbose` is set.
pub fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt};

        let default = if verbose {
            "transfer_ledger=debug,tower_http=debug"
        } else {
            "transfer_ledger=info"
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    });
}
