#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod backoff;
pub mod cancel;
pub mod entry;
pub mod error;
pub mod policy;
pub mod request;
pub mod response;
pub mod transport;
pub mod upstream;

pub use cancel::CancelToken;
pub use entry::CacheEntry;
pub use error::TransportError;
pub use policy::{CachePolicy, RetryPolicy};
pub use request::Request;
pub use response::Response;
pub use transport::{ByteStream, StreamedResponse, StreamingTransport, Transport};
pub use upstream::Upstream;

/// Raw byte payload type used for bodies and serialized cache values.
///
/// `Bytes` provides cheap reference-counted cloning, which matters because
/// cached bodies are cloned on every hit.
pub type Raw = bytes::Bytes;
