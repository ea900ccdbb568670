//! Freshness lifetime computation.

use chrono::{DateTime, Utc};
use http::HeaderMap;
use http::header::CACHE_CONTROL;
use regex::Regex;
use reverb_core::CachePolicy;
use std::sync::OnceLock;

fn max_age_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)max-age\s*=\s*(\d+)").expect("static pattern"))
}

/// Computes when a response stops being fresh.
///
/// When the policy respects server headers and the response carries a
/// `Cache-Control: max-age=N` directive, freshness is `now + N` seconds;
/// otherwise it is `now + policy.ttl`.
pub fn expires_at(policy: &CachePolicy, headers: &HeaderMap, now: DateTime<Utc>) -> DateTime<Utc> {
    if policy.respect_server_headers
        && let Some(value) = headers.get(CACHE_CONTROL).and_then(|v| v.to_str().ok())
        && let Some(captures) = max_age_re().captures(value)
        && let Ok(seconds) = captures[1].parse::<i64>()
    {
        return now
            .checked_add_signed(chrono::TimeDelta::seconds(seconds))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    chrono::TimeDelta::from_std(policy.ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use std::time::Duration;

    fn headers(cache_control: &'static str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(CACHE_CONTROL, HeaderValue::from_static(cache_control));
        map
    }

    #[test]
    fn max_age_wins_when_server_headers_respected() {
        let policy = CachePolicy::with_ttl(Duration::from_secs(60));
        let now = Utc::now();
        let expiry = expires_at(&policy, &headers("public, max-age=120"), now);
        assert_eq!(expiry, now + chrono::TimeDelta::seconds(120));
    }

    #[test]
    fn policy_ttl_used_without_max_age() {
        let policy = CachePolicy::with_ttl(Duration::from_secs(60));
        let now = Utc::now();
        let expiry = expires_at(&policy, &headers("no-transform"), now);
        assert_eq!(expiry, now + chrono::TimeDelta::seconds(60));
    }

    #[test]
    fn max_age_ignored_when_headers_not_respected() {
        let policy = CachePolicy {
            ttl: Duration::from_secs(60),
            respect_server_headers: false,
            key: None,
        };
        let now = Utc::now();
        let expiry = expires_at(&policy, &headers("max-age=9999"), now);
        assert_eq!(expiry, now + chrono::TimeDelta::seconds(60));
    }

    #[test]
    fn directive_match_is_case_insensitive() {
        let policy = CachePolicy::with_ttl(Duration::from_secs(60));
        let now = Utc::now();
        let expiry = expires_at(&policy, &headers("Max-Age=30"), now);
        assert_eq!(expiry, now + chrono::TimeDelta::seconds(30));
    }

    #[test]
    fn max_age_zero_expires_immediately() {
        let policy = CachePolicy::with_ttl(Duration::from_secs(60));
        let now = Utc::now();
        let expiry = expires_at(&policy, &headers("max-age=0"), now);
        assert_eq!(expiry, now);
    }
}
