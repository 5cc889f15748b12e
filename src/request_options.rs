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

//! Per-call options for the bidi streaming core.
//!
//! Unlike the unary RPCs in the rest of this client library, a bidi stream's
//! retry and resumption strategies are layered (`§6`/`§7`): the RPC-open call
//! itself is a single attempt (see [RequestOptions::gax]), retried by the
//! connector's own loop (C5), while a separate [read_resume_policy][crate::read_resume_policy]
//! or [write_resume_policy][crate::write_resume_policy] decides whether a
//! stream that opened fine but failed mid-flight should be resumed at all.

use crate::backoff_policy::BackoffPolicy;
use crate::read_resume_policy::ReadResumePolicy;
use crate::retry_policy::RetryPolicy;
use crate::retry_throttler::{RetryThrottler, SharedRetryThrottler};
use crate::write_resume_policy::WriteResumePolicy;
use std::sync::{Arc, Mutex};

/// Options shared by [crate::storage::bidi]'s read and write builders.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub retry_policy: Arc<dyn RetryPolicy>,
    pub backoff_policy: Arc<dyn BackoffPolicy>,
    pub retry_throttler: SharedRetryThrottler,
    read_resume_policy: Arc<dyn ReadResumePolicy>,
    write_resume_policy: Arc<dyn WriteResumePolicy>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_resume_policy(&self) -> Arc<dyn ReadResumePolicy> {
        self.read_resume_policy.clone()
    }

    pub fn set_read_resume_policy(&mut self, policy: Arc<dyn ReadResumePolicy>) {
        self.read_resume_policy = policy;
    }

    pub fn write_resume_policy(&self) -> Arc<dyn WriteResumePolicy> {
        self.write_resume_policy.clone()
    }

    pub fn set_write_resume_policy(&mut self, policy: Arc<dyn WriteResumePolicy>) {
        self.write_resume_policy = policy;
    }

    /// Options forwarded to [gaxi::grpc::Client::bidi_stream_with_status] for
    /// the single streaming RPC-open call. This client's own connector owns
    /// the retry loop (`§6`), so no retry configuration is forwarded here:
    /// the underlying call is always a single attempt.
    pub(crate) fn gax(&self) -> gax::options::RequestOptions {
        gax::options::RequestOptions::default()
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            retry_policy: Arc::new(crate::retry_policy::default()),
            backoff_policy: Arc::new(crate::backoff_policy::default()),
            retry_throttler: crate::retry_throttler::default(),
            read_resume_policy: Arc::new(crate::read_resume_policy::Recommended),
            write_resume_policy: Arc::new(crate::write_resume_policy::Recommended),
        }
    }
}
