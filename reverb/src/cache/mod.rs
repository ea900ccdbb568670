//! Conditional HTTP response caching.
//!
//! [`CacheFuture`] wraps the GET path of an upstream with lookup/store
//! against a pluggable [`Store`]: fresh hits resolve without touching the
//! network, stale entries are revalidated with conditional headers, and a
//! `304 Not Modified` refreshes the stored entry and resolves with the
//! cached body as a synthesized `200`.
//!
//! Concurrent misses for the same key are deliberately uncoordinated — no
//! locking, no single-flight — so two racing requests may both hit the
//! network and both write; the last writer wins.
//!
//! [`Store`]: reverb_backend::Store

mod freshness;
mod future;
mod key;

pub use freshness::expires_at;
pub use future::CacheFuture;
pub use key::cache_key;
