//! Subscription registry
//!
//! Maps each symbol to the set of downstream connections interested in
//! it. Membership only, no ordering. A connection appears in a symbol's
//! set iff it sent a subscribe for that symbol and its transport is still
//! open; `unsubscribe_all` runs exactly once, on transport close.
//!
//! Uses BTreeMap for deterministic iteration.

use std::collections::BTreeMap;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use types::symbol::Symbol;

/// Unique downstream connection identifier.
pub type ClientId = u64;

/// Outbound handle for one downstream connection: serialized payloads
/// pushed here are written to the socket by the connection task.
pub type ClientSender = UnboundedSender<String>;

/// Symbol → subscriber-set membership.
pub struct SubscriptionRegistry {
    subscribers: BTreeMap<Symbol, BTreeMap<ClientId, ClientSender>>,
}

impl SubscriptionRegistry {
    /// Create a registry with an empty set per configured symbol.
    pub fn new(symbols: &[Symbol]) -> Self {
        let subscribers = symbols
            .iter()
            .map(|s| (s.clone(), BTreeMap::new()))
            .collect();
        Self { subscribers }
    }

    /// Idempotent add. Symbols outside the configured set get a set
    /// passively created on first subscribe; they are tolerated, not
    /// validated, and simply never receive data.
    pub fn subscribe(&mut self, symbol: Symbol, client_id: ClientId, sender: ClientSender) {
        let set = self.subscribers.entry(symbol.clone()).or_insert_with(|| {
            debug!(%symbol, "first subscribe for symbol outside the configured set");
            BTreeMap::new()
        });
        set.insert(client_id, sender);
    }

    /// Remove this connection from every symbol's set. Returns how many
    /// subscriptions were dropped.
    pub fn unsubscribe_all(&mut self, client_id: ClientId) -> usize {
        let mut removed = 0;
        for set in self.subscribers.values_mut() {
            if set.remove(&client_id).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Read-only enumeration of a symbol's subscribers for broadcast.
    pub fn subscribers_of(
        &self,
        symbol: &Symbol,
    ) -> impl Iterator<Item = (&ClientId, &ClientSender)> {
        self.subscribers
            .get(symbol)
            .into_iter()
            .flat_map(|set| set.iter())
    }

    /// Number of subscribers for a symbol.
    pub fn subscriber_count(&self, symbol: &Symbol) -> usize {
        self.subscribers.get(symbol).map_or(0, |set| set.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn registry() -> SubscriptionRegistry {
        SubscriptionRegistry::new(&[Symbol::new("ethusdt"), Symbol::new("arbusdt")])
    }

    #[test]
    fn test_subscribe_and_enumerate() {
        let mut reg = registry();
        let (tx, _rx) = mpsc::unbounded_channel();
        let symbol = Symbol::new("ethusdt");

        reg.subscribe(symbol.clone(), 1, tx);

        assert_eq!(reg.subscriber_count(&symbol), 1);
        let ids: Vec<ClientId> = reg.subscribers_of(&symbol).map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let mut reg = registry();
        let (tx, _rx) = mpsc::unbounded_channel();
        let symbol = Symbol::new("ethusdt");

        reg.subscribe(symbol.clone(), 1, tx.clone());
        reg.subscribe(symbol.clone(), 1, tx);

        assert_eq!(reg.subscriber_count(&symbol), 1);
    }

    #[test]
    fn test_unsubscribe_all_clears_every_symbol() {
        let mut reg = registry();
        let (tx, _rx) = mpsc::unbounded_channel();

        reg.subscribe(Symbol::new("ethusdt"), 1, tx.clone());
        reg.subscribe(Symbol::new("arbusdt"), 1, tx.clone());
        reg.subscribe(Symbol::new("ethusdt"), 2, tx);

        assert_eq!(reg.unsubscribe_all(1), 2);
        assert_eq!(reg.subscriber_count(&Symbol::new("ethusdt")), 1);
        assert_eq!(reg.subscriber_count(&Symbol::new("arbusdt")), 0);

        // Second call finds nothing left to remove.
        assert_eq!(reg.unsubscribe_all(1), 0);
    }

    #[test]
    fn test_unconfigured_symbol_passively_accepted() {
        let mut reg = registry();
        let (tx, _rx) = mpsc::unbounded_channel();
        let unknown = Symbol::new("dogeusdt");

        assert_eq!(reg.subscriber_count(&unknown), 0);
        reg.subscribe(unknown.clone(), 7, tx);
        assert_eq!(reg.subscriber_count(&unknown), 1);
    }
}
