//! Trading-pair symbol identifier
//!
//! A `Symbol` names one tracked order book (e.g. "ethusdt"). The set of
//! symbols is fixed at startup; symbols are never created or destroyed at
//! runtime. Exchange stream paths are lowercase, so construction
//! normalizes case.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for one tracked order book.
///
/// Stored lowercase to match the upstream stream naming
/// (`<symbol>@depth`). Deserialization normalizes the same way
/// construction does, so `"ETHUSDT"` on the wire names the same book
/// as `Symbol::new("ethusdt")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Symbol::try_new(s).ok_or_else(|| de::Error::custom("symbol must not be empty"))
    }
}

impl Symbol {
    /// Create a new Symbol, normalizing to lowercase.
    ///
    /// # Panics
    /// Panics if the symbol is empty.
    pub fn new(symbol: impl Into<String>) -> Self {
        let s = symbol.into();
        assert!(!s.is_empty(), "Symbol must not be empty");
        Self(s.to_ascii_lowercase())
    }

    /// Try to create a Symbol, returning None if empty.
    pub fn try_new(symbol: impl Into<String>) -> Option<Self> {
        let s = symbol.into();
        if s.is_empty() {
            None
        } else {
            Some(Self(s.to_ascii_lowercase()))
        }
    }

    /// Get the symbol string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
