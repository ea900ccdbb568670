use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{self, Poll};

use bytes::Bytes;
use chrono::Utc;
use futures::future::BoxFuture;
use futures::ready;
use http::header::{IF_MODIFIED_SINCE, IF_NONE_MATCH};
use http::{Method, StatusCode};
use pin_project::pin_project;
use reverb_backend::{Store, StoreError, StoreValue};
use reverb_core::{CacheEntry, CachePolicy, CancelToken, Request, Response, Upstream};
use tracing::{debug, warn};

use crate::cache::{cache_key, expires_at};
use crate::error::Error;

const POLL_AFTER_READY_ERROR: &str = "CacheFuture can't be polled after finishing";
const REQUEST_TAKEN_ERROR: &str = "Request already taken from state";
const RESPONSE_TAKEN_ERROR: &str = "Response already taken from state";

type StoreReadFuture = BoxFuture<'static, Result<Option<StoreValue>, StoreError>>;
type StoreWriteFuture = BoxFuture<'static, Result<(), StoreError>>;

#[pin_project(project = StateProj)]
enum State<F> {
    /// About to look up the store (or bypass it for non-GET).
    Initial,
    /// Store lookup in flight.
    PollStore {
        #[pin]
        read: StoreReadFuture,
    },
    /// Network trip in flight; carries the stale entry when revalidating.
    PollUpstream {
        #[pin]
        upstream_future: F,
        revalidating: Option<CacheEntry>,
    },
    /// Store write in flight; the response to resolve with rides along.
    UpdateStore {
        #[pin]
        write: StoreWriteFuture,
        response: Option<Response>,
    },
    /// Settled; polling again is a bug.
    Done,
}

/// Future driving one cached request.
///
/// Applies only to GET: any other method delegates straight to the upstream
/// with no cache interaction. The store is consulted first; a fresh entry
/// resolves immediately, a stale entry rides along for conditional
/// revalidation, and a miss goes to the network. Successful (2xx) responses
/// with positive freshness are written back; a `304 Not Modified` refreshes
/// the stored entry's expiry and resolves as a synthesized `200` carrying
/// the cached body and headers. Error statuses are never cached.
///
/// Store failures are absorbed: a failed read is a miss, a failed write is
/// logged and the response still resolves.
#[pin_project]
pub struct CacheFuture<U>
where
    U: Upstream<Request, Response = Result<Response, Error>>,
{
    store: Arc<dyn Store>,
    upstream: U,
    request: Option<Request>,
    policy: CachePolicy,
    key: String,
    bypass: bool,
    cancel: CancelToken,
    #[pin]
    state: State<U::Future>,
}

impl<U> CacheFuture<U>
where
    U: Upstream<Request, Response = Result<Response, Error>>,
{
    /// Creates a cache future over the given store and upstream.
    pub fn new(
        store: Arc<dyn Store>,
        upstream: U,
        request: Request,
        policy: CachePolicy,
        cancel: CancelToken,
    ) -> Self {
        let bypass = request.method != Method::GET;
        let key = cache_key(&policy, &request.url);
        CacheFuture {
            store,
            upstream,
            request: Some(request),
            policy,
            key,
            bypass,
            cancel,
            state: State::Initial,
        }
    }

    /// The store key this future reads and writes.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Decodes a stored value into a cache entry.
///
/// Anything malformed or partially typed is a miss, never an error.
fn decode_entry(value: StoreValue) -> Option<CacheEntry> {
    match serde_json::from_slice(value.data()) {
        Ok(entry) => Some(entry),
        Err(error) => {
            warn!(%error, "undecodable cache entry treated as miss");
            None
        }
    }
}

/// Serializes and writes an entry back to the store.
///
/// The store-level value carries no expiry of its own: freshness lives in
/// the entry, and retention past freshness is what makes stale-entry
/// revalidation possible. The remaining freshness is passed as the TTL hint.
fn write_entry(store: Arc<dyn Store>, key: String, entry: CacheEntry) -> StoreWriteFuture {
    Box::pin(async move {
        let ttl = entry.remaining_ttl(Utc::now());
        let encoded = serde_json::to_vec(&entry)
            .map_err(|error| StoreError::Serialization(error.to_string()))?;
        store
            .write(&key, StoreValue::new(Bytes::from(encoded), None), ttl)
            .await
    })
}

impl<U> Future for CacheFuture<U>
where
    U: Upstream<Request, Response = Result<Response, Error>>,
{
    type Output = Result<Response, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        if this.cancel.register(cx.waker()) {
            this.state.set(State::Done);
            return Poll::Ready(Err(Error::Cancelled));
        }

        loop {
            let next = match this.state.as_mut().project() {
                StateProj::Initial => {
                    if *this.bypass {
                        let request = this.request.take().expect(REQUEST_TAKEN_ERROR);
                        let upstream_future = this.upstream.call(request);
                        State::PollUpstream {
                            upstream_future,
                            revalidating: None,
                        }
                    } else {
                        let store = this.store.clone();
                        let key = this.key.clone();
                        debug!(key = %this.key, "looking up cache");
                        let read = Box::pin(async move { store.read(&key).await });
                        State::PollStore { read }
                    }
                }
                StateProj::PollStore { read } => {
                    let looked_up = ready!(read.poll(cx)).unwrap_or_else(|error| {
                        warn!(%error, "cache read failed, treating as miss");
                        None
                    });
                    let entry = looked_up.and_then(decode_entry);
                    let now = Utc::now();

                    match entry {
                        Some(entry) if entry.is_fresh(now) => {
                            debug!(key = %this.key, "fresh cache hit");
                            this.state.set(State::Done);
                            return Poll::Ready(Ok(entry.to_response()));
                        }
                        stale => {
                            let mut request = this.request.take().expect(REQUEST_TAKEN_ERROR);
                            if let Some(entry) = &stale
                                && this.policy.respect_server_headers
                            {
                                if let Some(etag) = entry.etag() {
                                    request.replace_header(IF_NONE_MATCH, etag.clone());
                                }
                                if let Some(modified) = entry.last_modified() {
                                    request.replace_header(IF_MODIFIED_SINCE, modified.clone());
                                }
                            }
                            debug!(
                                key = %this.key,
                                revalidating = stale.is_some(),
                                "cache miss or stale, going to network"
                            );
                            let upstream_future = this.upstream.call(request);
                            State::PollUpstream {
                                upstream_future,
                                revalidating: stale,
                            }
                        }
                    }
                }
                StateProj::PollUpstream {
                    upstream_future,
                    revalidating,
                } => {
                    let response = match ready!(upstream_future.poll(cx)) {
                        Ok(response) => response,
                        Err(error) => {
                            this.state.set(State::Done);
                            return Poll::Ready(Err(error));
                        }
                    };

                    if *this.bypass {
                        this.state.set(State::Done);
                        return Poll::Ready(Ok(response));
                    }

                    let now = Utc::now();
                    if response.status == StatusCode::NOT_MODIFIED
                        && let Some(mut entry) = revalidating.take()
                    {
                        // Validators matched: keep the cached body, status,
                        // and headers, refresh only the expiry, and resolve
                        // as a plain 200.
                        entry.expires_at = expires_at(this.policy, &response.headers, now);
                        let refreshed = Response::new(
                            StatusCode::OK,
                            entry.headers.clone(),
                            entry.body.clone(),
                        );
                        debug!(key = %this.key, "revalidated, refreshing expiry");
                        if entry.remaining_ttl(now).is_some() {
                            let write =
                                write_entry(this.store.clone(), this.key.clone(), entry);
                            State::UpdateStore {
                                write,
                                response: Some(refreshed),
                            }
                        } else {
                            this.state.set(State::Done);
                            return Poll::Ready(Ok(refreshed));
                        }
                    } else if response.status.is_success() {
                        let expiry = expires_at(this.policy, &response.headers, now);
                        if expiry > now {
                            let entry = CacheEntry::new(
                                response.status,
                                response.headers.clone(),
                                response.body.clone(),
                                expiry,
                            );
                            debug!(key = %this.key, %expiry, "storing response");
                            let write =
                                write_entry(this.store.clone(), this.key.clone(), entry);
                            State::UpdateStore {
                                write,
                                response: Some(response),
                            }
                        } else {
                            this.state.set(State::Done);
                            return Poll::Ready(Ok(response));
                        }
                    } else {
                        // Error statuses (and a 304 without a stale entry)
                        // are never written to the cache.
                        this.state.set(State::Done);
                        return Poll::Ready(Ok(response));
                    }
                }
                StateProj::UpdateStore { write, response } => {
                    if let Err(error) = ready!(write.poll(cx)) {
                        warn!(%error, key = %this.key, "cache write failed");
                    }
                    let response = response.take().expect(RESPONSE_TAKEN_ERROR);
                    this.state.set(State::Done);
                    return Poll::Ready(Ok(response));
                }
                StateProj::Done => panic!("{}", POLL_AFTER_READY_ERROR),
            };
            this.state.set(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use http::header::{CACHE_CONTROL, ETAG};
    use http::{HeaderMap, HeaderValue};
    use reverb_moka::MokaStore;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn response(status: u16, headers: HeaderMap, body: &'static str) -> Response {
        Response::new(StatusCode::from_u16(status).unwrap(), headers, body.into())
    }

    /// Upstream returning a fixed response, counting calls and logging the
    /// requests it saw.
    struct FixedUpstream {
        calls: Arc<AtomicU32>,
        seen: Arc<Mutex<Vec<Request>>>,
        status: u16,
        headers: HeaderMap,
        body: &'static str,
    }

    impl FixedUpstream {
        fn new(status: u16, body: &'static str) -> Self {
            FixedUpstream {
                calls: Arc::new(AtomicU32::new(0)),
                seen: Arc::new(Mutex::new(Vec::new())),
                status,
                headers: HeaderMap::new(),
                body,
            }
        }

        fn upstream(
            &self,
        ) -> impl Upstream<Request, Response = Result<Response, Error>> + use<> {
            let calls = self.calls.clone();
            let seen = self.seen.clone();
            let status = self.status;
            let headers = self.headers.clone();
            let body = self.body;
            move |request: Request| {
                calls.fetch_add(1, Ordering::SeqCst);
                seen.lock().unwrap().push(request);
                let headers = headers.clone();
                async move { Ok(response(status, headers, body)) }
            }
        }
    }

    fn store() -> Arc<dyn Store> {
        Arc::new(MokaStore::new(64))
    }

    async fn seed_stale_entry(store: &Arc<dyn Store>, policy: &CachePolicy, url: &str) {
        let mut headers = HeaderMap::new();
        headers.insert(ETAG, HeaderValue::from_static("\"v1\""));
        let entry = CacheEntry::new(
            StatusCode::OK,
            headers,
            "cached body".into(),
            Utc::now() - TimeDelta::seconds(30),
        );
        let encoded = serde_json::to_vec(&entry).unwrap();
        store
            .write(
                &cache_key(policy, url),
                StoreValue::new(encoded.into(), None),
                None,
            )
            .await
            .unwrap();
    }

    async fn stored_entry(store: &Arc<dyn Store>, policy: &CachePolicy, url: &str) -> Option<CacheEntry> {
        store
            .read(&cache_key(policy, url))
            .await
            .unwrap()
            .and_then(decode_entry)
    }

    #[tokio::test]
    async fn second_lookup_hits_cache_without_network() {
        let store = store();
        let policy = CachePolicy::with_ttl(Duration::from_secs(60));
        let fixture = FixedUpstream::new(200, "hello");
        let url = "http://example.com/data";

        let first = CacheFuture::new(
            store.clone(),
            fixture.upstream(),
            Request::get(url),
            policy.clone(),
            CancelToken::new(),
        )
        .await
        .unwrap();
        let second = CacheFuture::new(
            store.clone(),
            fixture.upstream(),
            Request::get(url),
            policy,
            CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(fixture.calls.load(Ordering::SeqCst), 1, "one network trip");
        assert_eq!(first.body, second.body);
        assert_eq!(second.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn stale_entry_revalidates_with_conditional_headers() {
        let store = store();
        let policy = CachePolicy::with_ttl(Duration::from_secs(60));
        let url = "http://example.com/etagged";
        seed_stale_entry(&store, &policy, url).await;

        let fixture = FixedUpstream::new(304, "");
        let before = Utc::now();
        let resolved = CacheFuture::new(
            store.clone(),
            fixture.upstream(),
            Request::get(url),
            policy.clone(),
            CancelToken::new(),
        )
        .await
        .unwrap();

        // The conditional request carried the cached validator.
        let seen = fixture.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].headers.get(IF_NONE_MATCH).unwrap(), "\"v1\"");

        // Resolved as a synthesized 200 with the original cached body.
        assert_eq!(resolved.status, StatusCode::OK);
        assert_eq!(resolved.body, Bytes::from_static(b"cached body"));

        // The stored entry's expiry was refreshed; body untouched.
        let entry = stored_entry(&store, &policy, url).await.unwrap();
        assert!(entry.expires_at > before);
        assert_eq!(entry.body, Bytes::from_static(b"cached body"));
    }

    #[tokio::test]
    async fn error_statuses_are_never_cached() {
        let store = store();
        let policy = CachePolicy::with_ttl(Duration::from_secs(60));
        let fixture = FixedUpstream::new(500, "boom");
        let url = "http://example.com/broken";

        let resolved = CacheFuture::new(
            store.clone(),
            fixture.upstream(),
            Request::get(url),
            policy.clone(),
            CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(resolved.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(stored_entry(&store, &policy, url).await.is_none());
    }

    #[tokio::test]
    async fn non_get_bypasses_the_cache() {
        let store = store();
        let policy = CachePolicy::with_ttl(Duration::from_secs(60));
        let fixture = FixedUpstream::new(200, "created");
        let url = "http://example.com/submit";

        for _ in 0..2 {
            let request = Request::new(Method::POST, url);
            CacheFuture::new(
                store.clone(),
                fixture.upstream(),
                request,
                policy.clone(),
                CancelToken::new(),
            )
            .await
            .unwrap();
        }

        assert_eq!(fixture.calls.load(Ordering::SeqCst), 2, "no caching");
        assert!(stored_entry(&store, &policy, url).await.is_none());
    }

    #[tokio::test]
    async fn malformed_stored_value_is_a_miss() {
        let store = store();
        let policy = CachePolicy::with_ttl(Duration::from_secs(60));
        let url = "http://example.com/corrupt";
        store
            .write(
                &cache_key(&policy, url),
                StoreValue::new(Bytes::from_static(b"{garbage"), None),
                None,
            )
            .await
            .unwrap();

        let fixture = FixedUpstream::new(200, "fresh");
        let resolved = CacheFuture::new(
            store.clone(),
            fixture.upstream(),
            Request::get(url),
            policy,
            CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(fixture.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolved.body, Bytes::from_static(b"fresh"));
    }

    #[tokio::test]
    async fn server_max_age_governs_stored_expiry() {
        let store = store();
        let policy = CachePolicy::with_ttl(Duration::from_secs(1));
        let url = "http://example.com/long-lived";

        let mut fixture = FixedUpstream::new(200, "hello");
        fixture
            .headers
            .insert(CACHE_CONTROL, HeaderValue::from_static("max-age=120"));

        CacheFuture::new(
            store.clone(),
            fixture.upstream(),
            Request::get(url),
            policy.clone(),
            CancelToken::new(),
        )
        .await
        .unwrap();

        let entry = stored_entry(&store, &policy, url).await.unwrap();
        assert!(entry.expires_at > Utc::now() + TimeDelta::seconds(60));
    }

    #[tokio::test]
    async fn explicit_key_is_used_verbatim() {
        let policy = CachePolicy {
            key: Some("pinned".to_string()),
            ..CachePolicy::default()
        };
        let fixture = FixedUpstream::new(200, "x");
        let future = CacheFuture::new(
            store(),
            fixture.upstream(),
            Request::get("http://example.com/whatever"),
            policy,
            CancelToken::new(),
        );
        assert_eq!(future.key(), "pinned");
    }
}
