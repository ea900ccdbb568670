//! Server-Sent Events.
//!
//! Three pieces, composed by [`connect`]:
//!
//! - [`EventParser`] incrementally parses the SSE wire format (field lines
//!   `id:`, `event:`, `data:`, `retry:`, comment lines starting with `:`,
//!   records terminated by a blank line), tolerating field and delimiter
//!   splits across arbitrary chunk boundaries.
//! - [`ConnectionState`] tracks one logical stream's mutable state: attempt
//!   count, last event id, server-supplied retry interval, cancellation.
//! - The reconnecting executor drives repeated connection attempts against
//!   a [`StreamingTransport`] per an [`SseReconnectPolicy`], delivering
//!   events through a caller callback and settling the connect future once,
//!   on the first successful (2xx) header block.
//!
//! [`StreamingTransport`]: reverb_core::StreamingTransport

mod connection;
mod event;
mod parser;
mod policy;
mod state;

pub use connection::{SseConnection, StreamHandle, connect, connect_with_token};
pub use event::SseEvent;
pub use parser::EventParser;
pub use policy::{ReconnectCallback, ReconnectPredicate, SseReconnectPolicy};
pub use state::ConnectionState;
