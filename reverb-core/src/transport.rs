//! Collaborator traits for the actual I/O implementation.
//!
//! Reverb never performs socket I/O itself. The engine is generic over a
//! transport that issues buffered request/response exchanges and, for SSE,
//! opens long-lived byte streams. Adapters translate [`Request`] into
//! whatever the chosen HTTP library expects, at this boundary only.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use http::{HeaderMap, StatusCode};

use crate::{Request, Response, TransportError};

/// A stream of body chunks as delivered by the transport.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// A response whose headers have arrived but whose body is still streaming.
///
/// For SSE, receiving this with a 2xx status is what "connected" means: the
/// overall connect future settles on the header block, independent of any
/// events arriving afterwards.
pub struct StreamedResponse {
    /// Response status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// The body, delivered incrementally.
    pub body: ByteStream,
}

impl fmt::Debug for StreamedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamedResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &"...")
            .finish()
    }
}

/// Issues buffered HTTP exchanges.
///
/// Dropping the returned future must abort the underlying operation; the
/// executors rely on this for cancellation.
pub trait Transport: Send + Sync {
    /// Sends the request and resolves once the full response is buffered.
    fn send(&self, request: Request) -> BoxFuture<'static, Result<Response, TransportError>>;
}

/// Opens long-lived streaming exchanges (SSE).
pub trait StreamingTransport: Send + Sync {
    /// Sends the request and resolves once the status line and header block
    /// have arrived, leaving the body streaming.
    fn open(&self, request: Request)
    -> BoxFuture<'static, Result<StreamedResponse, TransportError>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: Request) -> BoxFuture<'static, Result<Response, TransportError>> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: Request) -> BoxFuture<'static, Result<Response, TransportError>> {
        (**self).send(request)
    }
}

impl<T: StreamingTransport + ?Sized> StreamingTransport for Arc<T> {
    fn open(
        &self,
        request: Request,
    ) -> BoxFuture<'static, Result<StreamedResponse, TransportError>> {
        (**self).open(request)
    }
}

impl<T: StreamingTransport + ?Sized> StreamingTransport for Box<T> {
    fn open(
        &self,
        request: Request,
    ) -> BoxFuture<'static, Result<StreamedResponse, TransportError>> {
        (**self).open(request)
    }
}
