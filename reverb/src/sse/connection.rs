//! The reconnecting SSE executor.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::StreamExt;
use http::{HeaderMap, StatusCode};
use reverb_core::{
    ByteStream, CancelToken, Request, StreamingTransport, TransportError,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{ConnectionState, EventParser, SseEvent, SseReconnectPolicy};
use crate::error::Error;

/// What a settled SSE connect future resolves with: the accepted stream's
/// status line and header block. Events keep flowing through the `on_event`
/// callback after resolution.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    /// Status of the accepted (2xx) connection attempt.
    pub status: StatusCode,
    /// Response headers of the accepted attempt.
    pub headers: HeaderMap,
}

type EventCallback = Box<dyn FnMut(SseEvent) + Send>;
type ErrorCallback = Box<dyn FnMut(&TransportError) + Send>;

/// A cancellable handle to one logical SSE stream.
///
/// Awaiting it settles exactly once: `Ok(StreamHandle)` on the first
/// connection attempt that yields a 2xx header block, or `Err` if
/// reconnection is disabled, ineligible, exhausted, or cancelled first.
/// After resolution the stream keeps running in the background; drops are
/// absorbed by reconnection or reported through `on_error`.
#[derive(Debug)]
pub struct SseConnection {
    outcome: oneshot::Receiver<Result<StreamHandle, Error>>,
    cancel: CancelToken,
    driver: JoinHandle<()>,
}

impl SseConnection {
    /// Requests cancellation: aborts any in-flight attempt, cancels any
    /// pending reconnect timer, and rejects the connect future if it has
    /// not settled yet. Idempotent, and wins any race with a concurrent
    /// success or failure.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of this stream's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Whether the background driver has exited.
    pub fn is_finished(&self) -> bool {
        self.driver.is_finished()
    }

    /// Waits for the background driver to exit entirely (terminal failure,
    /// exhaustion, or cancellation). Useful in tests and orderly shutdown.
    pub async fn closed(self) {
        let _ = self.driver.await;
    }
}

impl Future for SseConnection {
    type Output = Result<StreamHandle, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.outcome).poll(cx).map(|received| {
            match received {
                Ok(outcome) => outcome,
                // The driver never drops the sender before settling; if it
                // is gone anyway the operation was torn down.
                Err(_) => Err(Error::Cancelled),
            }
        })
    }
}

/// Opens a reconnecting SSE stream.
///
/// Configuration problems are surfaced synchronously; everything
/// asynchronous arrives through the returned [`SseConnection`] and the
/// callbacks.
pub fn connect(
    transport: Arc<dyn StreamingTransport>,
    request: Request,
    policy: SseReconnectPolicy,
    on_event: impl FnMut(SseEvent) + Send + 'static,
    on_error: impl FnMut(&TransportError) + Send + 'static,
) -> Result<SseConnection, Error> {
    connect_with_token(transport, request, policy, CancelToken::new(), on_event, on_error)
}

/// [`connect`] with a caller-supplied cancellation token.
///
/// A token cancelled before the call rejects with a cancellation error
/// without issuing any I/O.
pub fn connect_with_token(
    transport: Arc<dyn StreamingTransport>,
    request: Request,
    policy: SseReconnectPolicy,
    cancel: CancelToken,
    on_event: impl FnMut(SseEvent) + Send + 'static,
    on_error: impl FnMut(&TransportError) + Send + 'static,
) -> Result<SseConnection, Error> {
    policy.validate().map_err(Error::Config)?;

    let (settle_tx, outcome) = oneshot::channel();
    let state = ConnectionState::new(request, policy, cancel.clone());
    let driver = tokio::spawn(drive(
        transport,
        state,
        settle_tx,
        Box::new(on_event),
        Box::new(on_error),
    ));

    Ok(SseConnection {
        outcome,
        cancel,
        driver,
    })
}

type SettleSlot = Option<oneshot::Sender<Result<StreamHandle, Error>>>;

fn settle(slot: &mut SettleSlot, outcome: Result<StreamHandle, Error>) {
    if let Some(sender) = slot.take() {
        let _ = sender.send(outcome);
    }
}

async fn drive(
    transport: Arc<dyn StreamingTransport>,
    mut state: ConnectionState,
    settle_tx: oneshot::Sender<Result<StreamHandle, Error>>,
    mut on_event: EventCallback,
    mut on_error: ErrorCallback,
) {
    let cancel = state.cancel().clone();
    let mut slot: SettleSlot = Some(settle_tx);

    loop {
        if cancel.is_cancelled() {
            settle(&mut slot, Err(Error::Cancelled));
            return;
        }

        let request = state.begin_attempt();
        debug!(attempt = state.attempt_count(), url = %request.url, "connecting event stream");

        let opened = tokio::select! {
            _ = cancel.cancelled() => {
                settle(&mut slot, Err(Error::Cancelled));
                return;
            }
            opened = transport.open(request) => opened,
        };

        let error = match opened {
            Ok(stream) if stream.status.is_success() => {
                debug!(status = %stream.status, "event stream connected");
                settle(
                    &mut slot,
                    Ok(StreamHandle {
                        status: stream.status,
                        headers: stream.headers,
                    }),
                );
                match read_stream(&mut state, &cancel, stream.body, &mut on_event).await {
                    StreamEnd::Cancelled => return,
                    StreamEnd::Dropped(error) => error,
                }
            }
            Ok(stream) => TransportError::new(format!(
                "unexpected status {} from event stream",
                stream.status
            )),
            Err(error) => error,
        };

        warn!(%error, attempt = state.attempt_count(), "event stream attempt failed");

        if state.eligible(&error) {
            let delay = state.reconnect_delay();
            if let Some(callback) = &state.policy().on_reconnect {
                callback(state.attempt_count(), delay, &error);
            }
            debug!(?delay, "reconnecting after delay");
            tokio::select! {
                _ = cancel.cancelled() => {
                    settle(&mut slot, Err(Error::Cancelled));
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            continue;
        }

        if cancel.is_cancelled() {
            settle(&mut slot, Err(Error::Cancelled));
            return;
        }

        // Terminal failure: reject if the connect future is still waiting,
        // otherwise report through the error callback.
        match slot.take() {
            Some(sender) => {
                let _ = sender.send(Err(Error::Transport {
                    attempts: state.attempt_count(),
                    message: error.message().to_string(),
                }));
            }
            None => on_error(&error),
        }
        return;
    }
}

enum StreamEnd {
    Cancelled,
    Dropped(TransportError),
}

/// Pumps one connected stream: parse chunks, record bookkeeping, deliver
/// events. Returns how the stream ended.
async fn read_stream(
    state: &mut ConnectionState,
    cancel: &CancelToken,
    mut body: ByteStream,
    on_event: &mut EventCallback,
) -> StreamEnd {
    let mut parser = EventParser::new();
    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return StreamEnd::Cancelled,
            chunk = body.next() => chunk,
        };
        match chunk {
            Some(Ok(bytes)) => {
                for event in parser.feed(&bytes) {
                    // Bookkeeping first: Last-Event-ID and retry hints must
                    // be recorded even if the stream drops mid-callback.
                    state.note_event(&event);
                    on_event(event);
                }
            }
            Some(Err(error)) => return StreamEnd::Dropped(error),
            None => return StreamEnd::Dropped(TransportError::new("connection closed by server")),
        }
    }
}
