use std::env;
use std::time::Duration;

/// Runtime knobs. All read from environment variables with sensible defaults.
///
/// Environment variables:
/// - `CHANNELSTREAM_SECRET` — shared secret for the privileged control plane
///   (unset or empty = open, useful for local development)
/// - `WAKE_CONNECTIONS_AFTER_MS` — long-poll primary wait (default: 3000)
/// - `DRAIN_TIMEOUT_MS` — long-poll drain-window tail wait (default: 250)
/// - `GC_INTERVAL_SECS` — idle-connection sweep cadence (default: 10)
/// - `GC_CONNS_AFTER_SECS` — idle age before a connection is reaped (default: 60)
pub struct ServerConfig {
    pub secret: Option<String>,
    pub wake_connections_after_ms: u64,
    pub drain_timeout_ms: u64,
    pub gc_interval_secs: u64,
    pub gc_conns_after_secs: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            secret: None,
            wake_connections_after_ms: 3000,
            drain_timeout_ms: 250,
            gc_interval_secs: 10,
            gc_conns_after_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig from environment variables, with defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("CHANNELSTREAM_SECRET")
            && !val.is_empty()
        {
            config.secret = Some(val);
        }
        if let Ok(val) = env::var("WAKE_CONNECTIONS_AFTER_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.wake_connections_after_ms = n;
        }
        if let Ok(val) = env::var("DRAIN_TIMEOUT_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.drain_timeout_ms = n;
        }
        if let Ok(val) = env::var("GC_INTERVAL_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.gc_interval_secs = n;
        }
        if let Ok(val) = env::var("GC_CONNS_AFTER_SECS")
            && let Ok(n) = val.parse::<i64>()
        {
            config.gc_conns_after_secs = n;
        }

        config
    }

    pub fn wake_timeout(&self) -> Duration {
        Duration::from_millis(self.wake_connections_after_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}
