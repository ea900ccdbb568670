use std::future::Future;
use std::pin::Pin;
use std::task::{self, Poll};

use futures::ready;
use pin_project::pin_project;
use reverb_core::{CancelToken, Request, Response, RetryPolicy, TransportError, Upstream};
use tracing::{debug, warn};

use crate::error::Error;

const POLL_AFTER_READY_ERROR: &str = "RetryFuture can't be polled after finishing";

#[pin_project(project = StateProj)]
enum State<F> {
    /// About to issue the next attempt.
    Issue,
    /// An attempt is in flight.
    PollUpstream {
        #[pin]
        upstream_future: F,
    },
    /// Waiting out the backoff delay before re-issuing.
    Backoff {
        #[pin]
        sleep: tokio::time::Sleep,
    },
    /// Settled; polling again is a bug.
    Done,
}

/// Future driving repeated attempts of one request against an upstream.
///
/// Settlement contract: a transport error with retries exhausted (or not
/// retryable at all) **rejects** with [`Error::Transport`] carrying the
/// total attempt count; an obtained response — any status, including a
/// retryable one whose retries ran out — **resolves** unchanged. "The
/// transport succeeded" and "the application got an error status" are
/// different failure classes, and this layer only ever inspects status to
/// decide whether to retry.
///
/// Cancelling the associated [`CancelToken`] aborts the in-flight attempt
/// and any pending backoff timer (both are dropped) and rejects with
/// [`Error::Cancelled`] if the future is still unsettled.
#[pin_project]
pub struct RetryFuture<U>
where
    U: Upstream<Request, Response = Result<Response, TransportError>>,
{
    upstream: U,
    request: Request,
    policy: RetryPolicy,
    cancel: CancelToken,
    /// Total attempts issued, for diagnostics and terminal errors.
    attempts: u32,
    /// Retries consumed out of `policy.max_retries`.
    retries: u32,
    #[pin]
    state: State<U::Future>,
}

impl<U> RetryFuture<U>
where
    U: Upstream<Request, Response = Result<Response, TransportError>>,
{
    /// Creates a retry future for `request`.
    pub fn new(upstream: U, request: Request, policy: RetryPolicy, cancel: CancelToken) -> Self {
        RetryFuture {
            upstream,
            request,
            policy,
            cancel,
            attempts: 0,
            retries: 0,
            state: State::Issue,
        }
    }

    /// Total attempts issued so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl<U> Future for RetryFuture<U>
where
    U: Upstream<Request, Response = Result<Response, TransportError>>,
{
    type Output = Result<Response, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        // Cancellation wins every race: checked before any progress, and the
        // token wakes this future, so a cancel during a backoff or an
        // in-flight attempt is observed at the next poll. Replacing the
        // state drops the attempt future and the timer.
        if this.cancel.register(cx.waker()) {
            this.state.set(State::Done);
            return Poll::Ready(Err(Error::Cancelled));
        }

        loop {
            let next = match this.state.as_mut().project() {
                StateProj::Issue => {
                    *this.attempts += 1;
                    debug!(
                        attempt = *this.attempts,
                        url = %this.request.url,
                        "issuing attempt"
                    );
                    let upstream_future = this.upstream.call(this.request.clone());
                    State::PollUpstream { upstream_future }
                }
                StateProj::PollUpstream { upstream_future } => {
                    match ready!(upstream_future.poll(cx)) {
                        Ok(response) => {
                            let status = response.status.as_u16();
                            if this.policy.retryable_status(status)
                                && *this.retries < this.policy.max_retries
                            {
                                *this.retries += 1;
                                let delay = this.policy.delay_for(*this.retries);
                                warn!(status, ?delay, retry = *this.retries, "retryable status");
                                State::Backoff {
                                    sleep: tokio::time::sleep(delay),
                                }
                            } else {
                                this.state.set(State::Done);
                                return Poll::Ready(Ok(response));
                            }
                        }
                        Err(error) => {
                            if this.policy.retryable_error(&error)
                                && *this.retries < this.policy.max_retries
                            {
                                *this.retries += 1;
                                let delay = this.policy.delay_for(*this.retries);
                                warn!(%error, ?delay, retry = *this.retries, "retryable error");
                                State::Backoff {
                                    sleep: tokio::time::sleep(delay),
                                }
                            } else {
                                this.state.set(State::Done);
                                return Poll::Ready(Err(Error::Transport {
                                    attempts: *this.attempts,
                                    message: error.message().to_string(),
                                }));
                            }
                        }
                    }
                }
                StateProj::Backoff { sleep } => {
                    ready!(sleep.poll(cx));
                    State::Issue
                }
                StateProj::Done => panic!("{}", POLL_AFTER_READY_ERROR),
            };
            this.state.set(next);
        }
    }
}
