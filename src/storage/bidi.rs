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

mod active_read;
mod builder;
mod connector;
mod normalized_range;
mod range_reader;
mod redirect;
mod remaining_range;
mod requested_range;
mod resume_redirect;
mod retry_redirect;
pub(crate) mod stub;
mod transport;
mod worker;
mod write_builder;
mod write_connector;
mod write_redirect;
mod write_resume_redirect;
mod write_retry_redirect;
mod write_worker;

use crate::request_options::RequestOptions;
use tokio::sync::mpsc::Receiver;

pub use builder::OpenObject;
pub use connector::{Client, TonicStreaming};
pub use write_builder::AppendObject;
pub use write_connector::{WriteClient, WriteTonicStreaming};

#[cfg(test)]
mod mocks;
#[cfg(test)]
mod write_test_support;
