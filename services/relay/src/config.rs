//! Relay configuration
//!
//! A static, process-wide configuration fixed at startup: the tracked
//! symbol set, the upstream feed endpoint, backoff bounds, and snapshot
//! depth. Defaults match the production deployment; environment variables
//! override for local runs.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::warn;
use types::symbol::Symbol;

/// Configuration for the relay process.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Symbols to track. Fixed for the process lifetime.
    pub symbols: Vec<Symbol>,
    /// Upstream stream endpoint base, without the per-symbol path.
    pub feed_endpoint: String,
    /// Address for the downstream WebSocket server.
    pub listen_addr: SocketAddr,
    /// Levels per side in broadcast snapshots.
    pub snapshot_depth: usize,
    /// Initial reconnect delay.
    pub base_backoff: Duration,
    /// Reconnect delay cap.
    pub max_backoff: Duration,
    /// Upstream handshake timeout.
    pub connect_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            symbols: vec![
                Symbol::new("ethusdt"),
                Symbol::new("maticusdt"),
                Symbol::new("arbusdt"),
            ],
            feed_endpoint: "wss://stream.binance.com:9443/ws".to_string(),
            listen_addr: "0.0.0.0:8080".parse().expect("static addr"),
            snapshot_depth: 10,
            base_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl RelayConfig {
    /// Build from defaults with environment overrides:
    /// `RELAY_SYMBOLS` (comma-separated), `RELAY_FEED_ENDPOINT`,
    /// `RELAY_LISTEN_ADDR`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("RELAY_SYMBOLS") {
            let symbols: Vec<Symbol> = raw
                .split(',')
                .filter_map(|s| Symbol::try_new(s.trim()))
                .collect();
            if symbols.is_empty() {
                warn!(%raw, "RELAY_SYMBOLS parsed to an empty set, keeping defaults");
            } else {
                config.symbols = symbols;
            }
        }

        if let Ok(endpoint) = std::env::var("RELAY_FEED_ENDPOINT") {
            config.feed_endpoint = endpoint;
        }

        if let Ok(addr) = std::env::var("RELAY_LISTEN_ADDR") {
            match addr.parse() {
                Ok(parsed) => config.listen_addr = parsed,
                Err(e) => warn!(%addr, error = %e, "invalid RELAY_LISTEN_ADDR, keeping default"),
            }
        }

        config
    }

    /// Full stream URL for one symbol's depth feed.
    pub fn stream_url(&self, symbol: &Symbol) -> String {
        format!("{}/{}@depth", self.feed_endpoint, symbol)
    }
}
