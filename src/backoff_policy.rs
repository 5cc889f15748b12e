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

//! The backoff policy consulted by the retry manager (C5) between attempts.
//!
//! Kept separate from [crate::retry_policy::RetryPolicy]: the retry policy
//! classifies an error and decides whether to continue, this policy only
//! decides how long to sleep before the next attempt.

use std::time::{Duration, Instant};

/// Computes the delay before the next attempt.
pub trait BackoffPolicy: Send + Sync + std::fmt::Debug {
    fn on_failure(&self, loop_start: Instant, attempt_count: u32) -> Duration;
}

/// Exponential backoff with a ceiling, starting from `initial_delay` and
/// scaling up on each attempt, capped at `maximum_delay`.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    maximum_delay: Duration,
    scaling: f64,
}

impl BackoffPolicy for ExponentialBackoff {
    fn on_failure(&self, _loop_start: Instant, attempt_count: u32) -> Duration {
        let factor = self.scaling.powi(attempt_count.saturating_sub(1) as i32);
        self.initial_delay.mul_f64(factor.max(1.0)).min(self.maximum_delay)
    }
}

/// Builds an [ExponentialBackoff].
#[derive(Clone, Debug)]
pub struct ExponentialBackoffBuilder {
    initial_delay: Duration,
    maximum_delay: Duration,
    scaling: f64,
}

impl ExponentialBackoffBuilder {
    pub fn new() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            maximum_delay: Duration::from_secs(60),
            scaling: 2.0,
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_maximum_delay(mut self, delay: Duration) -> Self {
        self.maximum_delay = delay;
        self
    }

    pub fn with_scaling(mut self, scaling: f64) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn build(self) -> Result<ExponentialBackoff, crate::error::Error> {
        if self.scaling < 1.0 {
            return Err(crate::error::Error::configuration(
                "backoff scaling factor must be >= 1.0",
            ));
        }
        if self.maximum_delay < self.initial_delay {
            return Err(crate::error::Error::configuration(
                "backoff maximum delay must be >= initial delay",
            ));
        }
        Ok(ExponentialBackoff {
            initial_delay: self.initial_delay,
            maximum_delay: self.maximum_delay,
            scaling: self.scaling,
        })
    }
}

impl Default for ExponentialBackoffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The default backoff policy for the bidi streaming RPCs.
///
/// The service recommends exponential backoff with jitter, starting with a
/// one second backoff and doubling on each attempt, capped at 60 seconds.
/// Jitter is left to callers wrapping this policy; the core only guarantees
/// the deterministic envelope.
pub fn default() -> impl BackoffPolicy {
    ExponentialBackoffBuilder::new()
        .with_initial_delay(Duration::from_secs(1))
        .with_maximum_delay(Duration::from_secs(60))
        .with_scaling(2.0)
        .build()
        .expect("statically configured policy should succeed")
}
