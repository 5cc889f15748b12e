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

use super::write_redirect::is_write_redirect;
use crate::write_resume_policy::{ResumeQuery, ResumeResult, WriteResumePolicy};
use std::sync::Arc;

/// Decorate a [WriteResumePolicy] to continue on redirect errors.
///
/// Redirects are not really failures: the server is telling us to reconnect
/// to a different backend, possibly with a rotated write handle. We want the
/// resume policy applications configure to govern real failures, while
/// redirects are always followed (subject to whatever attempt limit the
/// application's policy already enforces).
#[derive(Clone, Debug)]
pub struct WriteResumeRedirect<T> {
    inner: T,
}

impl<T> WriteResumeRedirect<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl WriteResumePolicy for WriteResumeRedirect<Arc<dyn WriteResumePolicy>> {
    fn on_error(&self, query: &ResumeQuery, error: crate::Error) -> ResumeResult {
        match self.inner.on_error(query, error) {
            ResumeResult::Permanent(e) if is_write_redirect(&e) => ResumeResult::Continue(e),
            result => result,
        }
    }
}
