//! The client facade.
//!
//! [`Client`] owns the injected collaborators — transport, streaming
//! transport, cache store — and wires the executors together: the cache
//! layer wraps the retry executor, which wraps the transport. There is no
//! process-wide default anything; every dependency is constructed by the
//! caller and passed in.

use std::sync::Arc;

use futures::future::BoxFuture;
use reverb_backend::Store;
use reverb_core::{
    CachePolicy, CancelToken, Request, Response, RetryPolicy, StreamingTransport, Transport,
    TransportError, Upstream,
};

use crate::cache::CacheFuture;
use crate::error::Error;
use crate::retry::RetryFuture;
use crate::sse::{self, SseConnection, SseEvent, SseReconnectPolicy};

/// [`Upstream`] adapter over a [`Transport`]: one call, one wire attempt.
#[derive(Clone)]
pub struct TransportUpstream {
    transport: Arc<dyn Transport>,
}

impl TransportUpstream {
    /// Wraps a transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        TransportUpstream { transport }
    }
}

impl Upstream<Request> for TransportUpstream {
    type Response = Result<Response, TransportError>;
    type Future = BoxFuture<'static, Result<Response, TransportError>>;

    fn call(&mut self, request: Request) -> Self::Future {
        self.transport.send(request)
    }
}

/// [`Upstream`] adapter that runs every call through the retry executor.
///
/// This is what makes the layers compose: the cache layer's "issue the
/// request" step becomes a full retry sequence.
#[derive(Clone)]
pub struct RetryUpstream<U> {
    inner: U,
    policy: RetryPolicy,
    cancel: CancelToken,
}

impl<U> RetryUpstream<U>
where
    U: Upstream<Request, Response = Result<Response, TransportError>> + Clone,
{
    /// Wraps an upstream with a retry policy. The token cancels every
    /// sequence started through this adapter.
    pub fn new(inner: U, policy: RetryPolicy, cancel: CancelToken) -> Self {
        RetryUpstream {
            inner,
            policy,
            cancel,
        }
    }
}

impl<U> Upstream<Request> for RetryUpstream<U>
where
    U: Upstream<Request, Response = Result<Response, TransportError>> + Clone + Send,
{
    type Response = Result<Response, Error>;
    type Future = RetryFuture<U>;

    fn call(&mut self, request: Request) -> Self::Future {
        RetryFuture::new(
            self.inner.clone(),
            request,
            self.policy.clone(),
            self.cancel.clone(),
        )
    }
}

/// The assembled engine.
///
/// Build one with [`Client::builder`], injecting the transport and
/// (optionally) a streaming transport, a cache store, and a default retry
/// policy. A client is cheap to clone; clones share the collaborators.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    streaming: Option<Arc<dyn StreamingTransport>>,
    store: Option<Arc<dyn Store>>,
    retry_policy: RetryPolicy,
}

impl Client {
    /// Starts building a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Issues a request through the retry executor with the client's
    /// default policy (one bare attempt when none was configured).
    pub fn execute(&self, request: Request) -> RetryFuture<TransportUpstream> {
        self.execute_with_cancel(request, CancelToken::new())
    }

    /// [`Client::execute`] with a caller-supplied cancellation token.
    pub fn execute_with_cancel(
        &self,
        request: Request,
        cancel: CancelToken,
    ) -> RetryFuture<TransportUpstream> {
        RetryFuture::new(
            TransportUpstream::new(self.transport.clone()),
            request,
            self.retry_policy.clone(),
            cancel,
        )
    }

    /// Issues a request through the retry executor with an explicit policy.
    pub fn execute_with_retry(
        &self,
        request: Request,
        policy: RetryPolicy,
        cancel: CancelToken,
    ) -> Result<RetryFuture<TransportUpstream>, Error> {
        policy.validate().map_err(Error::Config)?;
        Ok(RetryFuture::new(
            TransportUpstream::new(self.transport.clone()),
            request,
            policy,
            cancel,
        ))
    }

    /// Issues a GET through the cache layer; the network path runs through
    /// the retry executor with the client's default policy.
    ///
    /// Fails synchronously when no store was injected or the policy is
    /// invalid.
    pub fn execute_cached(
        &self,
        request: Request,
        policy: CachePolicy,
    ) -> Result<CacheFuture<RetryUpstream<TransportUpstream>>, Error> {
        self.execute_cached_with_cancel(request, policy, CancelToken::new())
    }

    /// [`Client::execute_cached`] with a caller-supplied cancellation token.
    /// The token covers the whole composed operation: store lookup, retry
    /// sequence, and store write-back.
    pub fn execute_cached_with_cancel(
        &self,
        request: Request,
        policy: CachePolicy,
        cancel: CancelToken,
    ) -> Result<CacheFuture<RetryUpstream<TransportUpstream>>, Error> {
        policy.validate().map_err(Error::Config)?;
        let store = self
            .store
            .clone()
            .ok_or_else(|| Error::Config("no cache store configured".to_string()))?;
        let upstream = RetryUpstream::new(
            TransportUpstream::new(self.transport.clone()),
            self.retry_policy.clone(),
            cancel.clone(),
        );
        Ok(CacheFuture::new(store, upstream, request, policy, cancel))
    }

    /// Opens a reconnecting SSE stream through the streaming transport.
    ///
    /// Fails synchronously when no streaming transport was injected or the
    /// policy is invalid.
    pub fn connect_sse(
        &self,
        request: Request,
        policy: SseReconnectPolicy,
        on_event: impl FnMut(SseEvent) + Send + 'static,
        on_error: impl FnMut(&TransportError) + Send + 'static,
    ) -> Result<SseConnection, Error> {
        let streaming = self
            .streaming
            .clone()
            .ok_or_else(|| Error::Config("no streaming transport configured".to_string()))?;
        sse::connect(streaming, request, policy, on_event, on_error)
    }
}

/// Builder for [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    streaming: Option<Arc<dyn StreamingTransport>>,
    store: Option<Arc<dyn Store>>,
    retry_policy: Option<RetryPolicy>,
}

impl ClientBuilder {
    /// Sets the transport used for buffered exchanges. Required.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Sets the transport used for SSE streams.
    pub fn streaming_transport(mut self, transport: impl StreamingTransport + 'static) -> Self {
        self.streaming = Some(Arc::new(transport));
        self
    }

    /// Sets the cache store used by [`Client::execute_cached`].
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the default retry policy. Without one, requests are issued
    /// exactly once.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Validates the configuration and assembles the client.
    pub fn build(self) -> Result<Client, Error> {
        let transport = self
            .transport
            .ok_or_else(|| Error::Config("a transport is required".to_string()))?;
        let retry_policy = self.retry_policy.unwrap_or_else(RetryPolicy::none);
        retry_policy.validate().map_err(Error::Config)?;
        Ok(Client {
            transport,
            streaming: self.streaming,
            store: self.store,
            retry_policy,
        })
    }
}
