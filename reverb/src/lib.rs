#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Conditional HTTP response caching over a pluggable store.
pub mod cache;

/// The client facade: explicit dependency injection and composition of
/// cache over retry over transport.
pub mod client;

/// Engine error taxonomy.
pub mod error;

/// Retry with exponential backoff, as an explicit state-machine future.
pub mod retry;

/// Server-Sent-Events: wire parsing, connection state, reconnection.
pub mod sse;

pub use client::{Client, ClientBuilder, RetryUpstream, TransportUpstream};
pub use error::Error;

pub use reverb_core::{
    CacheEntry, CachePolicy, CancelToken, Raw, Request, Response, RetryPolicy, StreamedResponse,
    StreamingTransport, Transport, TransportError, Upstream, backoff,
};

/// The `reverb` prelude.
///
/// ```rust
/// use reverb::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{CachePolicy, CancelToken, Client, Error, Request, Response, RetryPolicy};
    pub use crate::sse::{SseEvent, SseReconnectPolicy};
}
