//! Relay core: command loop and fan-out broadcaster
//!
//! A single task owns the book store and the subscription registry and
//! drains a command channel. Feed tasks and connection tasks never touch
//! the shared state directly; they send commands. Each command runs to
//! completion before the next, so within one symbol diffs apply in
//! arrival order and every broadcast reflects the state immediately
//! after the diff that triggered it.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};
use types::protocol::{DepthUpdate, ServerPush};
use types::symbol::Symbol;

use crate::book::BookStore;
use crate::config::RelayConfig;
use crate::registry::{ClientId, ClientSender, SubscriptionRegistry};

/// Commands accepted by the relay task.
#[derive(Debug)]
pub enum RelayCommand {
    /// A parsed upstream diff for one symbol.
    ApplyDiff { symbol: Symbol, update: DepthUpdate },
    /// A downstream connection asked for a symbol's snapshots.
    Subscribe {
        symbol: Symbol,
        client_id: ClientId,
        sender: ClientSender,
    },
    /// A downstream transport closed; drop all its subscriptions.
    Disconnect { client_id: ClientId },
    /// The feed detected a sequence gap; rebuild this symbol's replica.
    ResetBook { symbol: Symbol },
}

/// Owner of the mutable relay state.
pub struct Relay {
    books: BookStore,
    registry: SubscriptionRegistry,
    commands: UnboundedReceiver<RelayCommand>,
}

impl Relay {
    /// Create the relay and the sender half of its command channel.
    pub fn new(config: &RelayConfig) -> (Self, UnboundedSender<RelayCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let relay = Self {
            books: BookStore::new(&config.symbols, config.snapshot_depth),
            registry: SubscriptionRegistry::new(&config.symbols),
            commands: rx,
        };
        (relay, tx)
    }

    /// Drain commands until every sender is dropped.
    pub async fn run(mut self) {
        info!("relay command loop started");
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
        }
        info!("relay command loop stopped");
    }

    /// Apply one command. Synchronous: no suspension between mutating
    /// the state and broadcasting the result.
    pub fn handle(&mut self, command: RelayCommand) {
        match command {
            RelayCommand::ApplyDiff { symbol, update } => {
                if self.books.apply_diff(&symbol, &update) {
                    self.broadcast(&symbol);
                }
            }
            RelayCommand::Subscribe {
                symbol,
                client_id,
                sender,
            } => {
                debug!(%symbol, client_id, "subscribe");
                self.registry
                    .subscribe(symbol.clone(), client_id, sender.clone());
                // Immediate snapshot for the new subscriber only.
                if let Some(payload) = self.serialized_snapshot(&symbol) {
                    if sender.send(payload).is_err() {
                        debug!(client_id, "subscriber closed before initial snapshot");
                    }
                }
            }
            RelayCommand::Disconnect { client_id } => {
                let removed = self.registry.unsubscribe_all(client_id);
                debug!(client_id, removed, "disconnect");
            }
            RelayCommand::ResetBook { symbol } => {
                info!(%symbol, "resetting book replica");
                self.books.reset(&symbol);
            }
        }
    }

    /// Push the symbol's current snapshot to every subscriber whose
    /// channel is still open. Serialized once; closed subscribers are
    /// skipped for this broadcast, their removal happens on disconnect.
    fn broadcast(&mut self, symbol: &Symbol) {
        let Some(payload) = self.serialized_snapshot(symbol) else {
            return;
        };
        for (&client_id, sender) in self.registry.subscribers_of(symbol) {
            if sender.send(payload.clone()).is_err() {
                debug!(client_id, %symbol, "skipping closed subscriber");
            }
        }
    }

    fn serialized_snapshot(&self, symbol: &Symbol) -> Option<String> {
        let data = self.books.snapshot(symbol)?;
        match serde_json::to_string(&ServerPush::Orderbook { data }) {
            Ok(payload) => Some(payload),
            Err(e) => {
                error!(%symbol, error = %e, "snapshot serialization failed");
                None
            }
        }
    }

    /// Number of subscribers for a symbol (test/introspection hook).
    pub fn subscriber_count(&self, symbol: &Symbol) -> usize {
        self.registry.subscriber_count(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;
    use types::protocol::OrderBookSnapshot;

    fn test_relay() -> Relay {
        let config = RelayConfig {
            symbols: vec![Symbol::new("ethusdt")],
            ..RelayConfig::default()
        };
        Relay::new(&config).0
    }

    fn diff(bids: &[(&str, &str)], asks: &[(&str, &str)]) -> DepthUpdate {
        DepthUpdate {
            first_update_id: None,
            final_update_id: None,
            bids: bids
                .iter()
                .map(|(p, s)| (p.to_string(), s.to_string()))
                .collect(),
            asks: asks
                .iter()
                .map(|(p, s)| (p.to_string(), s.to_string()))
                .collect(),
        }
    }

    fn recv_snapshot(rx: &mut UnboundedReceiver<String>) -> OrderBookSnapshot {
        let payload = rx.try_recv().expect("expected a push");
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["type"], "orderbook");
        serde_json::from_value(value["data"].clone()).unwrap()
    }

    #[test]
    fn test_subscribe_gets_immediate_snapshot() {
        let mut relay = test_relay();
        let (tx, mut rx) = mpsc::unbounded_channel();

        relay.handle(RelayCommand::Subscribe {
            symbol: Symbol::new("ethusdt"),
            client_id: 1,
            sender: tx,
        });

        let snap = recv_snapshot(&mut rx);
        assert_eq!(snap.symbol, Symbol::new("ethusdt"));
        assert!(snap.bids.is_empty());
        assert!(rx.try_recv().is_err(), "exactly one immediate push");
    }

    #[test]
    fn test_diff_broadcasts_to_subscriber() {
        let mut relay = test_relay();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let symbol = Symbol::new("ethusdt");

        relay.handle(RelayCommand::Subscribe {
            symbol: symbol.clone(),
            client_id: 1,
            sender: tx,
        });
        recv_snapshot(&mut rx);

        relay.handle(RelayCommand::ApplyDiff {
            symbol,
            update: diff(&[("100.0", "2.0")], &[("101.0", "1.0")]),
        });

        let snap = recv_snapshot(&mut rx);
        assert_eq!(snap.bids.len(), 1);
        assert_eq!(snap.bids[0].price.to_string(), "100.0");
        assert_eq!(snap.asks[0].price.to_string(), "101.0");
    }

    #[test]
    fn test_two_subscribers_get_identical_pushes() {
        let mut relay = test_relay();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let symbol = Symbol::new("ethusdt");

        for (id, tx) in [(1, tx1), (2, tx2)] {
            relay.handle(RelayCommand::Subscribe {
                symbol: symbol.clone(),
                client_id: id,
                sender: tx,
            });
        }
        recv_snapshot(&mut rx1);
        recv_snapshot(&mut rx2);

        relay.handle(RelayCommand::ApplyDiff {
            symbol,
            update: diff(&[("100.0", "2.0")], &[]),
        });

        let a = rx1.try_recv().expect("first subscriber push");
        let b = rx2.try_recv().expect("second subscriber push");
        assert_eq!(a, b, "single diff, one identical push per subscriber");
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_disconnect_stops_pushes() {
        let mut relay = test_relay();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let symbol = Symbol::new("ethusdt");

        relay.handle(RelayCommand::Subscribe {
            symbol: symbol.clone(),
            client_id: 1,
            sender: tx,
        });
        recv_snapshot(&mut rx);

        relay.handle(RelayCommand::Disconnect { client_id: 1 });
        relay.handle(RelayCommand::ApplyDiff {
            symbol: symbol.clone(),
            update: diff(&[("100.0", "2.0")], &[]),
        });

        assert!(rx.try_recv().is_err(), "no pushes after disconnect");
        assert_eq!(relay.subscriber_count(&symbol), 0);
    }

    #[test]
    fn test_closed_subscriber_skipped_others_served() {
        let mut relay = test_relay();
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let symbol = Symbol::new("ethusdt");

        relay.handle(RelayCommand::Subscribe {
            symbol: symbol.clone(),
            client_id: 1,
            sender: tx1,
        });
        relay.handle(RelayCommand::Subscribe {
            symbol: symbol.clone(),
            client_id: 2,
            sender: tx2,
        });
        recv_snapshot(&mut rx2);

        // Client 1's transport goes away mid-close; no Disconnect yet.
        drop(rx1);

        relay.handle(RelayCommand::ApplyDiff {
            symbol,
            update: diff(&[("100.0", "2.0")], &[]),
        });

        let snap = recv_snapshot(&mut rx2);
        assert_eq!(snap.bids.len(), 1);
    }

    #[test]
    fn test_diff_for_untracked_symbol_not_broadcast() {
        let mut relay = test_relay();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let unknown = Symbol::new("dogeusdt");

        // Passively accepted into the registry, but no book exists, so
        // no snapshot push and no broadcast ever fires.
        relay.handle(RelayCommand::Subscribe {
            symbol: unknown.clone(),
            client_id: 1,
            sender: tx,
        });
        assert!(rx.try_recv().is_err(), "no snapshot for untracked symbol");

        relay.handle(RelayCommand::ApplyDiff {
            symbol: unknown,
            update: diff(&[("1.0", "1.0")], &[]),
        });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_reset_book_clears_replica() {
        let mut relay = test_relay();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let symbol = Symbol::new("ethusdt");

        relay.handle(RelayCommand::ApplyDiff {
            symbol: symbol.clone(),
            update: diff(&[("100.0", "2.0")], &[]),
        });
        relay.handle(RelayCommand::ResetBook {
            symbol: symbol.clone(),
        });

        relay.handle(RelayCommand::Subscribe {
            symbol,
            client_id: 1,
            sender: tx,
        });
        let snap = recv_snapshot(&mut rx);
        assert!(snap.bids.is_empty());
    }
}
