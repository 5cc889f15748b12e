// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Retry policies for the bidi streaming core (`§4.5`/`§6`/`§7`).
//!
//! A [RetryPolicy] only classifies an error; it never sleeps. Sleeping is the
//! job of a [crate::backoff_policy::BackoffPolicy]. The retry manager (C5)
//! composes both, the same separation of concerns the rest of this client
//! library uses for its unary RPCs.

use crate::error::Error;
use std::time::{Duration, Instant};

/// The outcome of classifying an error against a [RetryPolicy].
#[derive(Debug)]
#[non_exhaustive]
pub enum RetryResult {
    /// The error is retriable and the policy has budget left; try again.
    Continue(Error),
    /// The error is retriable in principle, but the policy's budget (time or
    /// attempt count) is exhausted.
    Exhausted(Error),
    /// The error must not be retried, e.g. an integrity violation or a
    /// non-retriable RPC status.
    Permanent(Error),
}

impl RetryResult {
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    pub fn into_error(self) -> Error {
        match self {
            Self::Continue(e) | Self::Exhausted(e) | Self::Permanent(e) => e,
        }
    }
}

/// Classifies errors encountered while driving a bidi stream.
pub trait RetryPolicy: Send + Sync + std::fmt::Debug {
    /// `loop_start` is when the retry manager's loop began; `attempt_count`
    /// is the number of attempts made so far, including the one that just
    /// failed.
    fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> RetryResult;
}

/// The retry policy recommended for the bidi streaming RPCs.
///
/// Retries transport-level `Unavailable` and `Internal` statuses; treats
/// everything else (including the redirect-as-continue decoration applied
/// separately, see [crate::bidi::redirect]) as permanent. Integrity errors
/// ([Error::is_data_corruption]) are always permanent: `§7` requires they
/// "MUST NOT be masked by a retry".
#[derive(Clone, Debug, Default)]
pub struct RetryableErrors;

impl RetryPolicy for RetryableErrors {
    fn on_error(&self, _loop_start: Instant, _attempt_count: u32, error: Error) -> RetryResult {
        if error.is_data_corruption() || error.is_invalid_argument() || error.is_configuration() {
            return RetryResult::Permanent(error);
        }
        match error.status().map(|s| s.code()) {
            Some(tonic::Code::Unavailable) | Some(tonic::Code::Internal) => {
                RetryResult::Continue(error)
            }
            _ => RetryResult::Permanent(error),
        }
    }
}

/// Decorates an inner policy so `Continue` results past a time budget become
/// `Exhausted`.
#[derive(Clone, Debug)]
pub struct LimitedTime<P> {
    inner: P,
    maximum_duration: Duration,
}

impl<P> RetryPolicy for LimitedTime<P>
where
    P: RetryPolicy,
{
    fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> RetryResult {
        match self.inner.on_error(loop_start, attempt_count, error) {
            RetryResult::Continue(e) if loop_start.elapsed() >= self.maximum_duration => {
                RetryResult::Exhausted(e)
            }
            other => other,
        }
    }
}

/// Decorates an inner policy so `Continue` results past an attempt budget
/// become `Exhausted`.
#[derive(Clone, Debug)]
pub struct LimitedAttempts<P> {
    inner: P,
    maximum_attempts: u32,
}

impl<P> RetryPolicy for LimitedAttempts<P>
where
    P: RetryPolicy,
{
    fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> RetryResult {
        match self.inner.on_error(loop_start, attempt_count, error) {
            RetryResult::Continue(e) if attempt_count >= self.maximum_attempts => {
                RetryResult::Exhausted(e)
            }
            other => other,
        }
    }
}

/// Adds `.with_time_limit()`/`.with_attempt_limit()` decorators to any
/// [RetryPolicy], mirroring the rest of this client library's policy
/// extension traits.
pub trait RetryPolicyExt: RetryPolicy + Sized {
    fn with_time_limit(self, maximum_duration: Duration) -> LimitedTime<Self> {
        LimitedTime {
            inner: self,
            maximum_duration,
        }
    }

    fn with_attempt_limit(self, maximum_attempts: u32) -> LimitedAttempts<Self> {
        LimitedAttempts {
            inner: self,
            maximum_attempts,
        }
    }
}

impl<P: RetryPolicy> RetryPolicyExt for P {}

/// The default retry policy: retryable transport errors, bounded to 10
/// attempts over at most 60 seconds.
pub fn default() -> impl RetryPolicy {
    RetryableErrors.with_time_limit(Duration::from_secs(60)).with_attempt_limit(10)
}

/// A policy that never retries: every error is immediately exhausted.
#[derive(Clone, Debug)]
pub struct NeverRetry;

impl RetryPolicy for NeverRetry {
    fn on_error(&self, _loop_start: Instant, _attempt_count: u32, error: Error) -> RetryResult {
        RetryResult::Exhausted(error)
    }
}
