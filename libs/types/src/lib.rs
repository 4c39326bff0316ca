//! Types library for the depth relay
//!
//! Wire-level type definitions shared between the relay service and any
//! future consumers: trading symbols, price levels, and the tagged message
//! unions spoken on the upstream feed and the downstream client protocol.
//!
//! # Modules
//! - `symbol`: Trading-pair symbol identifier
//! - `level`: Price-level pairs with string-tuple wire encoding
//! - `protocol`: Upstream/downstream message unions and book snapshots

pub mod level;
pub mod protocol;
pub mod symbol;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::level::*;
    pub use crate::protocol::*;
    pub use crate::symbol::*;
}
