//! Upstream feed manager
//!
//! One supervised task per symbol holds the connection to that symbol's
//! depth stream, parses inbound frames, and forwards diffs to the relay.
//! The lifecycle is an explicit state machine — Disconnected → Connecting
//! → Connected → Disconnected — driven by a plain loop, with exponential
//! backoff between attempts and no retry cap. Symbols are fully
//! independent: one feed failing never affects another.
//!
//! Per-message failures are isolated: an unparsable frame is logged and
//! dropped without closing the connection. A detected update-id gap, by
//! contrast, means the replica is silently wrong, so the book is reset
//! and the connection dropped to rebuild from a fresh stream.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use types::protocol::DepthUpdate;
use types::symbol::Symbol;

use crate::backoff::Backoff;
use crate::config::RelayConfig;
use crate::error::FeedError;
use crate::relay::RelayCommand;

/// Connection lifecycle state for one symbol's feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Disconnected,
    Connecting,
    Connected,
}

/// What to do with an observed depth update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceDecision {
    /// Contiguous (or untagged) update; apply it.
    Apply,
    /// Entirely covered by already-applied ids; drop it.
    Stale,
}

/// Tracks update-id continuity across one connection.
///
/// Updates carry a first and final id; the next update's first id must
/// not jump past `last_final + 1`. Untagged updates are applied as-is.
#[derive(Debug, Default)]
pub struct SequenceTracker {
    last_final: Option<u64>,
}

impl SequenceTracker {
    pub fn observe(&mut self, update: &DepthUpdate) -> Result<SequenceDecision, FeedError> {
        let (Some(first), Some(last)) = (update.first_update_id, update.final_update_id) else {
            return Ok(SequenceDecision::Apply);
        };
        match self.last_final {
            Some(applied) if last <= applied => Ok(SequenceDecision::Stale),
            Some(applied) if first > applied + 1 => Err(FeedError::SequenceGap {
                expected: applied + 1,
                actual: first,
            }),
            _ => {
                self.last_final = Some(last);
                Ok(SequenceDecision::Apply)
            }
        }
    }
}

/// Owns one symbol's upstream connection and reconnect policy.
pub struct FeedSupervisor {
    symbol: Symbol,
    url: String,
    commands: UnboundedSender<RelayCommand>,
    backoff: Backoff,
    connect_timeout: Duration,
    state: FeedState,
}

impl FeedSupervisor {
    pub fn new(
        symbol: Symbol,
        url: String,
        commands: UnboundedSender<RelayCommand>,
        config: &RelayConfig,
    ) -> Self {
        Self {
            symbol,
            url,
            commands,
            backoff: Backoff::new(config.base_backoff, config.max_backoff),
            connect_timeout: config.connect_timeout,
            state: FeedState::Disconnected,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FeedState {
        self.state
    }

    /// Connect, stream, reconnect with backoff — forever, unless the
    /// relay itself goes away.
    pub async fn run(mut self) {
        info!(symbol = %self.symbol, url = %self.url, "feed supervisor started");
        loop {
            let err = self.connect_and_stream().await;
            self.state = FeedState::Disconnected;

            if matches!(err, FeedError::ChannelClosed) {
                info!(symbol = %self.symbol, "relay stopped, ending feed");
                return;
            }

            let delay = self.backoff.next_delay();
            warn!(
                symbol = %self.symbol,
                error = %err,
                delay_secs = delay.as_secs(),
                "feed disconnected, scheduling reconnect"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One connection attempt and its read loop. Always terminates with
    /// the error that ended the connection.
    async fn connect_and_stream(&mut self) -> FeedError {
        self.state = FeedState::Connecting;
        debug!(symbol = %self.symbol, "dialing upstream");

        let dial = connect_async(self.url.as_str());
        let (stream, _response) = match timeout(self.connect_timeout, dial).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return e.into(),
            Err(_) => return FeedError::ConnectTimeout(self.connect_timeout),
        };

        self.state = FeedState::Connected;
        self.backoff.reset();
        info!(symbol = %self.symbol, "connected to upstream depth feed");

        let (mut write, mut read) = stream.split();
        let mut tracker = SequenceTracker::default();

        while let Some(frame) = read.next().await {
            let message = match frame {
                Ok(message) => message,
                Err(e) => return e.into(),
            };

            match message {
                Message::Text(text) => {
                    let update = match serde_json::from_str::<DepthUpdate>(&text) {
                        Ok(update) => update,
                        Err(e) => {
                            warn!(symbol = %self.symbol, error = %e, "dropping unparsable depth frame");
                            continue;
                        }
                    };
                    match tracker.observe(&update) {
                        Ok(SequenceDecision::Apply) => {
                            let command = RelayCommand::ApplyDiff {
                                symbol: self.symbol.clone(),
                                update,
                            };
                            if self.commands.send(command).is_err() {
                                return FeedError::ChannelClosed;
                            }
                        }
                        Ok(SequenceDecision::Stale) => {
                            debug!(symbol = %self.symbol, "dropping stale depth frame");
                        }
                        Err(gap) => {
                            // The replica is desynced; rebuild it from a
                            // fresh connection rather than serving wrong
                            // levels indefinitely.
                            let _ = self.commands.send(RelayCommand::ResetBook {
                                symbol: self.symbol.clone(),
                            });
                            return gap;
                        }
                    }
                }
                Message::Ping(payload) => {
                    if let Err(e) = write.send(Message::Pong(payload)).await {
                        return e.into();
                    }
                }
                Message::Close(frame) => {
                    debug!(symbol = %self.symbol, ?frame, "upstream sent close");
                    return FeedError::ConnectionClosed;
                }
                _ => {}
            }
        }

        FeedError::ConnectionClosed
    }
}
