//! In-memory order book replica
//!
//! Maintains a best-effort mirror of each symbol's top-of-book from
//! incremental depth diffs. Uses `BTreeMap` keyed by `Decimal` price so
//! iteration order is the price order; bids read out reversed for
//! best-bid-first.
//!
//! Diff semantics:
//! - size > 0 → insert or overwrite the level
//! - size == 0 → remove the level (tombstone)
//! - unparsable price/size → that level is skipped, the rest applies

use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;
use tracing::debug;
use types::level::{parse_raw_level, PriceLevel, RawLevel};
use types::protocol::{DepthUpdate, OrderBookSnapshot};
use types::symbol::Symbol;

/// Current time as Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// One symbol's mutable book replica.
///
/// A side never contains a zero-size entry; tombstones delete the key
/// outright.
#[derive(Debug, Clone, Default)]
pub struct SymbolBook {
    /// Bid side: price → size. Best bid is the highest key.
    bids: BTreeMap<Decimal, Decimal>,
    /// Ask side: price → size. Best ask is the lowest key.
    asks: BTreeMap<Decimal, Decimal>,
}

impl SymbolBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one depth diff. Each level is an overwrite or removal, so
    /// applying the same diff twice is idempotent.
    pub fn apply(&mut self, update: &DepthUpdate) {
        apply_side(&mut self.bids, &update.bids);
        apply_side(&mut self.asks, &update.asks);
    }

    /// Top-of-book view: bids descending, asks ascending, each truncated
    /// to `depth` levels.
    pub fn top(&self, depth: usize) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(depth)
            .map(|(&price, &size)| PriceLevel::new(price, size))
            .collect();
        let asks = self
            .asks
            .iter()
            .take(depth)
            .map(|(&price, &size)| PriceLevel::new(price, size))
            .collect();
        (bids, asks)
    }

    /// Drop all levels on both sides. Used when the feed detects a
    /// sequence gap and the replica must rebuild from scratch.
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }

    /// Number of distinct bid price levels held.
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    /// Number of distinct ask price levels held.
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }
}

fn apply_side(side: &mut BTreeMap<Decimal, Decimal>, levels: &[RawLevel]) {
    for raw in levels {
        let Some(level) = parse_raw_level(raw) else {
            debug!(price = %raw.0, size = %raw.1, "skipping unparsable level");
            continue;
        };
        if level.is_tombstone() {
            side.remove(&level.price);
        } else {
            side.insert(level.price, level.size);
        }
    }
}

/// Book store: one replica per configured symbol, created at startup and
/// kept for the process lifetime.
pub struct BookStore {
    books: HashMap<Symbol, SymbolBook>,
    depth: usize,
}

impl BookStore {
    /// Create a store with an empty book per configured symbol.
    pub fn new(symbols: &[Symbol], depth: usize) -> Self {
        let books = symbols
            .iter()
            .map(|s| (s.clone(), SymbolBook::new()))
            .collect();
        Self { books, depth }
    }

    /// Apply a diff to one symbol's book. Returns false (no-op) for a
    /// symbol outside the configured set.
    pub fn apply_diff(&mut self, symbol: &Symbol, update: &DepthUpdate) -> bool {
        match self.books.get_mut(symbol) {
            Some(book) => {
                book.apply(update);
                true
            }
            None => {
                debug!(%symbol, "diff for untracked symbol ignored");
                false
            }
        }
    }

    /// Current top-of-book snapshot for a symbol, stamped with now.
    ///
    /// None for a symbol outside the configured set ("no data yet"),
    /// which is distinct from a known symbol with an empty book.
    pub fn snapshot(&self, symbol: &Symbol) -> Option<OrderBookSnapshot> {
        let book = self.books.get(symbol)?;
        let (bids, asks) = book.top(self.depth);
        Some(OrderBookSnapshot {
            symbol: symbol.clone(),
            bids,
            asks,
            timestamp: now_millis(),
        })
    }

    /// Reset one symbol's book to empty. No-op for untracked symbols.
    pub fn reset(&mut self, symbol: &Symbol) {
        if let Some(book) = self.books.get_mut(symbol) {
            book.clear();
        }
    }

    /// Whether the symbol is in the configured set.
    pub fn tracks(&self, symbol: &Symbol) -> bool {
        self.books.contains_key(symbol)
    }
}
