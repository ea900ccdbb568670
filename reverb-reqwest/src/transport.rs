//! reqwest-backed transport implementation.

use futures::future::BoxFuture;
use futures::{StreamExt, TryStreamExt};
use reverb_core::{
    Request, Response, StreamedResponse, StreamingTransport, Transport, TransportError,
};
use tracing::debug;

/// Transport over a shared [`reqwest::Client`].
///
/// Cloning shares the underlying client and its connection pool. All
/// transport errors are surfaced with reqwest's own message text, which is
/// what retry/reconnect substring matching runs against.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default reqwest client.
    pub fn new() -> Self {
        ReqwestTransport::default()
    }

    /// Creates a transport over an existing client, keeping its pool,
    /// timeouts, and TLS configuration.
    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }

    fn build(&self, request: Request) -> reqwest::RequestBuilder {
        self.client
            .request(request.method, &request.url)
            .headers(request.headers)
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: Request) -> BoxFuture<'static, Result<Response, TransportError>> {
        debug!(url = %request.url, method = %request.method, "sending request");
        let builder = self.build(request);
        Box::pin(async move {
            let response = builder
                .send()
                .await
                .map_err(|error| TransportError::new(error.to_string()))?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|error| TransportError::new(error.to_string()))?;
            Ok(Response::new(status, headers, body))
        })
    }
}

impl StreamingTransport for ReqwestTransport {
    fn open(
        &self,
        request: Request,
    ) -> BoxFuture<'static, Result<StreamedResponse, TransportError>> {
        debug!(url = %request.url, "opening stream");
        let builder = self.build(request);
        Box::pin(async move {
            let response = builder
                .send()
                .await
                .map_err(|error| TransportError::new(error.to_string()))?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes_stream()
                .map_err(|error| TransportError::new(error.to_string()))
                .boxed();
            Ok(StreamedResponse {
                status,
                headers,
                body,
            })
        })
    }
}
