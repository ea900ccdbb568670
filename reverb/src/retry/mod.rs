//! Retry with exponential backoff.
//!
//! [`RetryFuture`] is an explicit state machine over an [`Upstream`]
//! operation: issue an attempt, classify the outcome against the
//! [`RetryPolicy`], and either settle or arm a backoff timer and re-issue.
//! Within one future, attempts are strictly sequential — attempt *N+1*
//! starts only after attempt *N*'s outcome and its backoff delay.
//!
//! [`Upstream`]: reverb_core::Upstream
//! [`RetryPolicy`]: reverb_core::RetryPolicy

mod future;

pub use future::RetryFuture;
