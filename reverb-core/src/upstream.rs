//! The re-issuable operation seam driven by the executors.

use std::future::Future;

/// A request-taking operation that can be issued repeatedly.
///
/// The retry executor calls this once per attempt; the cache layer calls it
/// once per network trip, after augmenting the request with conditional
/// headers. Closures implement it directly, so a test can hand the executor
/// a plain `FnMut`:
///
/// ```
/// use reverb_core::{Request, Response, TransportError, Upstream};
/// use http::{HeaderMap, StatusCode};
///
/// let mut upstream = |_req: Request| async {
///     Ok::<_, TransportError>(Response::new(
///         StatusCode::OK,
///         HeaderMap::new(),
///         "hello".into(),
///     ))
/// };
/// let _future = upstream.call(Request::get("http://example.com/"));
/// ```
pub trait Upstream<Req> {
    /// The outcome of one issued attempt.
    type Response;

    /// The future resolving to one attempt's outcome.
    type Future: Future<Output = Self::Response> + Send;

    /// Issues the operation once.
    fn call(&mut self, request: Req) -> Self::Future;
}

impl<Req, F, Fut> Upstream<Req> for F
where
    F: FnMut(Req) -> Fut,
    Fut: Future + Send,
{
    type Response = Fut::Output;
    type Future = Fut;

    fn call(&mut self, request: Req) -> Self::Future {
        (self)(request)
    }
}
