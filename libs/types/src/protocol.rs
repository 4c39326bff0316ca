//! Wire protocol messages
//!
//! Tagged unions over the known message shapes on both sides of the
//! relay. Unrecognized or malformed frames fail deserialization and are
//! dropped by the caller; nothing is silently cast.
//!
//! Upstream: one `DepthUpdate` JSON frame per incremental book change.
//! Downstream: `ClientRequest` frames in, `ServerPush` frames out.

use serde::{Deserialize, Serialize};

use crate::level::{PriceLevel, RawLevel};
use crate::symbol::Symbol;

/// An incremental depth update from the upstream feed.
///
/// Only `b`/`a` are required. The first/final update ids (`U`/`u`) are
/// used for gap detection when present; all other metadata fields are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DepthUpdate {
    /// First update id covered by this event.
    #[serde(rename = "U", default)]
    pub first_update_id: Option<u64>,
    /// Final update id covered by this event.
    #[serde(rename = "u", default)]
    pub final_update_id: Option<u64>,
    /// Bid levels to insert/overwrite/remove, as raw string pairs.
    #[serde(rename = "b")]
    pub bids: Vec<RawLevel>,
    /// Ask levels to insert/overwrite/remove, as raw string pairs.
    #[serde(rename = "a")]
    pub asks: Vec<RawLevel>,
}

/// A derived, read-only view of one symbol's top-of-book.
///
/// Bids sorted descending by price, asks ascending, each truncated to the
/// configured depth. Never mutated; recomputed on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: Symbol,
    /// Top bids, best (highest) first.
    pub bids: Vec<PriceLevel>,
    /// Top asks, best (lowest) first.
    pub asks: Vec<PriceLevel>,
    /// Capture time, Unix epoch milliseconds.
    pub timestamp: i64,
}

/// Client → server frames on a downstream connection.
///
/// There is no unsubscribe message; closing the transport is the only way
/// to stop receiving updates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Subscribe to book snapshots for one symbol.
    SubscribeOrderbook { symbol: Symbol },
}

/// Server → client frames on a downstream connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerPush {
    /// Current top-of-book for a subscribed symbol.
    Orderbook { data: OrderBookSnapshot },
}
