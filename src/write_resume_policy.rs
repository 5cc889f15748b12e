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

//! Defines the write resume policies for Google Cloud Storage.
//!
//! A resumable appendable write may be interrupted after it starts: the
//! stream may break, stall, or the service may ask the client to reconnect
//! elsewhere. The client library can automatically recover from such errors
//! by opening a new bidi stream, querying the service for how many bytes it
//! actually persisted, and resuming from there (C7). The application may want
//! to control what errors are treated as recoverable, and how many failures
//! are tolerated before abandoning the write.
//!
//! The traits and types defined in this module allow for such customization.
//!
//! # Example
//! ```
//! # use gcs_bidi_streams::write_resume_policy::*;
//! # use gcs_bidi_streams::Error;
//! let policy = Recommended.with_attempt_limit(3);
//! assert!(matches!(policy.on_error(&ResumeQuery::new(0), Error::io("boom")), ResumeResult::Continue(_)));
//! assert!(matches!(policy.on_error(&ResumeQuery::new(1), Error::io("boom")), ResumeResult::Continue(_)));
//! assert!(matches!(policy.on_error(&ResumeQuery::new(2), Error::io("boom")), ResumeResult::Continue(_)));
//! assert!(matches!(policy.on_error(&ResumeQuery::new(3), Error::io("boom")), ResumeResult::Exhausted(_)));
//! ```

use crate::Error;

/// The outcome of classifying an error against a [WriteResumePolicy].
///
/// Mirrors [crate::read_resume_policy::ResumeResult]'s shape: resumption and
/// retry are separate decisions (a resumed write re-enters the retry
/// manager) but both only ever say continue, give up now, or give up for
/// good.
#[derive(Debug)]
#[non_exhaustive]
pub enum ResumeResult {
    /// Open a new stream, query the persisted offset, and continue this
    /// write from there.
    Continue(Error),
    /// The error is resumable in principle, but the policy's attempt budget
    /// is exhausted.
    Exhausted(Error),
    /// The write must not be resumed.
    Permanent(Error),
}

impl ResumeResult {
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

/// Defines the interface to write resume policies.
pub trait WriteResumePolicy: Send + Sync + std::fmt::Debug {
    /// Determines if the write should continue after an error.
    fn on_error(&self, status: &ResumeQuery, error: Error) -> ResumeResult;
}

/// Extension trait for [WriteResumePolicy].
pub trait WriteResumePolicyExt: Sized {
    /// Decorates a [WriteResumePolicy] to limit the number of resume
    /// attempts.
    ///
    /// This policy decorates an inner policy and limits the total number of
    /// attempts. Note that `on_error()` is not called before the initial
    /// (non-retry) attempt. Therefore, setting the maximum number of attempts
    /// to 0 or 1 results in no resume attempts.
    ///
    /// The policy passes through the results from the inner policy as long as
    /// `attempt_count < maximum_attempts`. Once the maximum number of attempts
    /// is reached, the policy returns [Exhausted][ResumeResult::Exhausted] if
    /// the inner policy returns [Continue][ResumeResult::Continue].
    fn with_attempt_limit(self, maximum_attempts: u32) -> LimitedAttemptCount<Self> {
        LimitedAttemptCount::new(self, maximum_attempts)
    }
}
impl<T: WriteResumePolicy> WriteResumePolicyExt for T {}

/// The inputs into a resume policy query.
///
/// On an error, the client library queries the resume policy as to whether it
/// should attempt a new write request or not. The client library provides an
/// instance of this type to the resume policy.
///
/// We use a struct so we can grow the amount of information without breaking
/// existing resume policies.
#[derive(Debug)]
#[non_exhaustive]
pub struct ResumeQuery {
    /// The number of times the write request has been interrupted already.
    pub attempt_count: u32,
}

impl ResumeQuery {
    /// Create a new instance.
    pub fn new(attempt_count: u32) -> Self {
        Self { attempt_count }
    }
}

/// The recommended policy when writing objects to Cloud Storage.
///
/// This policy resumes any write that fails due to a transport-level error
/// (I/O, RPC transport, or timeout), and otherwise treats errors that look
/// transient at the RPC-status level (`UNAVAILABLE`, `RESOURCE_EXHAUSTED`,
/// `INTERNAL`, `DEADLINE_EXCEEDED`) the same way. Data corruption errors
/// (checksum mismatches, progress bugs reported by [crate::error::WriteError])
/// are never resumed: the local state cannot be trusted to recover from one.
#[derive(Debug)]
pub struct Recommended;

impl WriteResumePolicy for Recommended {
    fn on_error(&self, _status: &ResumeQuery, error: Error) -> ResumeResult {
        match error {
            e if self::is_transient(&e) => ResumeResult::Continue(e),
            e => ResumeResult::Permanent(e),
        }
    }
}

fn is_transient(error: &Error) -> bool {
    error.is_io()
        || error.is_transport()
        || error.is_timeout()
        || error
            .status()
            .is_some_and(|s| is_transient_code(s.code()))
}

fn is_transient_code(code: tonic::Code) -> bool {
    // DeadlineExceeded is safe here because local deadline errors surface as
    // Error::is_timeout(), not as an RPC status.
    matches!(
        code,
        tonic::Code::Unavailable
            | tonic::Code::ResourceExhausted
            | tonic::Code::Internal
            | tonic::Code::DeadlineExceeded
    )
}

/// A resume policy that resumes regardless of the error type.
///
/// This may be useful in tests, or if used with a very low limit on the
/// number of allowed failures.
#[derive(Debug)]
pub struct AlwaysResume;

impl WriteResumePolicy for AlwaysResume {
    fn on_error(&self, _status: &ResumeQuery, error: Error) -> ResumeResult {
        ResumeResult::Continue(error)
    }
}

/// A resume policy that never resumes, regardless of the error type.
///
/// This is useful to disable the default resume policy.
#[derive(Debug)]
pub struct NeverResume;
impl WriteResumePolicy for NeverResume {
    fn on_error(&self, _status: &ResumeQuery, error: Error) -> ResumeResult {
        ResumeResult::Permanent(error)
    }
}

/// Decorates a resume policy to stop resuming after a certain number of
/// attempts.
#[derive(Debug)]
pub struct LimitedAttemptCount<P> {
    inner: P,
    maximum_attempts: u32,
}

impl<P> LimitedAttemptCount<P> {
    /// Create a new instance.
    pub fn new(inner: P, maximum_attempts: u32) -> Self {
        Self {
            inner,
            maximum_attempts,
        }
    }
}

impl<P> WriteResumePolicy for LimitedAttemptCount<P>
where
    P: WriteResumePolicy,
{
    fn on_error(&self, status: &ResumeQuery, error: Error) -> ResumeResult {
        match self.inner.on_error(status, error) {
            ResumeResult::Continue(e) if status.attempt_count >= self.maximum_attempts => {
                ResumeResult::Exhausted(e)
            }
            result => result,
        }
    }
}
