//! Cache key derivation.

use reverb_core::CachePolicy;
use sha1::{Digest, Sha1};

/// Resolves the store key for a request URL.
///
/// An explicit key on the policy wins; otherwise the key is
/// `"http_" + sha1(url)` in lowercase hex, so arbitrary URLs map to short,
/// filesystem-safe identifiers.
pub fn cache_key(policy: &CachePolicy, url: &str) -> String {
    match &policy.key {
        Some(key) => key.clone(),
        None => {
            let mut hasher = Sha1::new();
            hasher.update(url.as_bytes());
            format!("http_{}", hex::encode(hasher.finalize()))
        }
    }
}
