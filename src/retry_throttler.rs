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

//! Retry throttlers for the bidi streaming core (`§6`/`§7`).
//!
//! A [RetryThrottler] rejects retry attempts outright when the recent success
//! rate is too low, independent of whatever a [crate::retry_policy::RetryPolicy]
//! would otherwise allow. This caps the fraction of traffic retries can add
//! during an outage, the same role the throttler plays for this client
//! library's unary RPCs.

use crate::retry_policy::RetryResult;
use std::sync::{Arc, Mutex};

/// Decides whether a retry attempt should be throttled (rejected without
/// ever reaching the transport), and tracks the running state needed to
/// make that decision.
pub trait RetryThrottler: Send + Sync + std::fmt::Debug {
    /// Returns `true` if the next retry attempt should be rejected.
    fn throttle_retry_attempt(&self) -> bool;

    /// Reports the outcome of an attempt that failed and was classified by
    /// a [RetryPolicy][crate::retry_policy::RetryPolicy].
    fn on_retry_failure(&mut self, flow: &RetryResult);

    /// Reports that an attempt succeeded.
    fn on_success(&mut self);
}

/// A [RetryThrottler] shared between the retry manager and whatever
/// application code configured it.
pub type SharedRetryThrottler = Arc<Mutex<dyn RetryThrottler>>;

/// Never throttles. The default when the application does not configure one.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverThrottle;

impl RetryThrottler for NeverThrottle {
    fn throttle_retry_attempt(&self) -> bool {
        false
    }

    fn on_retry_failure(&mut self, _flow: &RetryResult) {}

    fn on_success(&mut self) {}
}

/// Rejects retry attempts with a probability proportional to the recent
/// ratio of failed to accepted requests.
///
/// Tracks `accept_count` (requests that ultimately succeeded, or whose final
/// classification was [RetryResult::Permanent]) and `request_count` (every
/// attempt, successful or not). The rejection probability is:
///
/// ```text
/// max(0, (request_count - factor * accept_count) / (request_count + 1))
/// ```
///
/// A higher `factor` tolerates a higher ratio of failures before throttling
/// kicks in.
#[derive(Clone, Debug)]
pub struct AdaptiveThrottler {
    accept_count: f64,
    request_count: f64,
    factor: f64,
}

impl AdaptiveThrottler {
    /// Creates a new adaptive throttler, clamping a negative `factor` to 0.
    pub fn clamp(factor: f64) -> Self {
        let factor = if factor < 0.0 { 0.0 } else { factor };
        Self {
            accept_count: 0.0,
            request_count: 0.0,
            factor,
        }
    }

    fn throttle<R: rand::Rng>(&self, rng: &mut R) -> bool {
        let reject_probability =
            (self.request_count - self.factor * self.accept_count) / (self.request_count + 1.0);
        let reject_probability = if reject_probability < 0.0 {
            0.0
        } else {
            reject_probability
        };
        rng.random_range(0.0..=1.0) <= reject_probability
    }
}

impl Default for AdaptiveThrottler {
    /// Initializes the throttler with the recommended `factor` of `2.0`.
    fn default() -> Self {
        Self::clamp(2.0)
    }
}

impl RetryThrottler for AdaptiveThrottler {
    fn throttle_retry_attempt(&self) -> bool {
        self.throttle(&mut rand::rng())
    }

    fn on_retry_failure(&mut self, flow: &RetryResult) {
        self.request_count += 1.0;
        if let RetryResult::Permanent(_) = flow {
            self.accept_count += 1.0;
        }
    }

    fn on_success(&mut self) {
        self.request_count += 1.0;
        self.accept_count += 1.0;
    }
}

/// A token-bucket throttler: rejects all retry attempts once the token count
/// drops to or below `min_tokens`. Failed attempts cost `error_cost` tokens;
/// any completed attempt (successful or permanently failed) refills one.
///
/// Implements the algorithm described in the [gRPC retry design].
///
/// [gRPC retry design]: https://github.com/grpc/proposal/blob/master/A6-client-retries.md
#[derive(Clone, Debug)]
pub struct CircuitBreaker {
    max_tokens: u64,
    min_tokens: u64,
    cur_tokens: u64,
    error_cost: u64,
}

impl CircuitBreaker {
    /// Creates a new instance, clamping `min_tokens` to be `<= tokens`.
    pub fn clamp(tokens: u64, min_tokens: u64, error_cost: u64) -> Self {
        Self {
            max_tokens: tokens,
            min_tokens: std::cmp::min(min_tokens, tokens),
            cur_tokens: tokens,
            error_cost,
        }
    }
}

impl Default for CircuitBreaker {
    /// Initializes the throttler with the recommended `(100, 50, 10)`.
    fn default() -> Self {
        Self::clamp(100, 50, 10)
    }
}

impl RetryThrottler for CircuitBreaker {
    fn throttle_retry_attempt(&self) -> bool {
        self.cur_tokens <= self.min_tokens
    }

    fn on_retry_failure(&mut self, flow: &RetryResult) {
        match flow {
            RetryResult::Continue(_) | RetryResult::Exhausted(_) => {
                self.cur_tokens = self.cur_tokens.saturating_sub(self.error_cost);
            }
            RetryResult::Permanent(_) => self.on_success(),
        }
    }

    fn on_success(&mut self) {
        self.cur_tokens = std::cmp::min(self.max_tokens, self.cur_tokens.saturating_add(1));
    }
}

/// The default retry throttler: never throttles.
pub fn default() -> SharedRetryThrottler {
    Arc::new(Mutex::new(NeverThrottle))
}
