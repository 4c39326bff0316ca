//! Order book depth relay
//!
//! Maintains a best-effort local replica of the top-of-book for a fixed
//! set of symbols from an external incremental depth stream, and fans the
//! consolidated top-10 snapshots out to downstream WebSocket subscribers
//! over a single upstream connection per symbol.
//!
//! # Architecture
//!
//! ```text
//! upstream depth feeds (one per symbol)
//!        │
//!   ┌────▼────┐   parse + gap check, reconnect with backoff
//!   │  feed   │
//!   └────┬────┘
//!        │ ApplyDiff / ResetBook
//!   ┌────▼────┐   owns books + registry, single writer
//!   │  relay  │
//!   └────┬────┘
//!        │ serialized snapshot per diff
//!   ┌────▼────┐   one task per subscriber connection
//!   │ server  │
//!   └─────────┘
//! ```
//!
//! Every mutable structure has exactly one owning task; all cross-task
//! communication goes over command channels.

pub mod backoff;
pub mod book;
pub mod config;
pub mod error;
pub mod feed;
pub mod registry;
pub mod relay;
pub mod server;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
