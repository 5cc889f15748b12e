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

//! Experimental bidirectional streaming support for Google Cloud Storage.
//!
//! **WARNING:** this crate is under active development. We expect multiple
//! breaking changes in the upcoming releases. Testing is also incomplete, we
//! do **not** recommend that you use this crate in production. We welcome
//! feedback about the APIs, documentation, missing features, bugs, etc.
//!
//! This crate layers bidi multi-range reads and resumable appendable writes
//! on top of the unary [Storage] client: a single `BidiReadObject`/
//! `BidiWriteObject` gRPC stream, a client-side resumption strategy that
//! reopens it transparently on a transient failure or service-issued
//! redirect, and an integrity layer that never lets a retry mask a corrupted
//! read or write.
//!
//! [storage]: https://cloud.google.com/storage

pub mod backoff_policy;
pub mod checksum;
pub mod error;
pub mod model;
pub mod model_ext;
pub mod object_descriptor;
pub mod read_object;
pub mod read_resume_policy;
pub mod request_options;
pub mod retry_policy;
pub mod retry_throttler;
pub mod storage;
pub mod stub;
pub mod upload_source;
pub mod write_resume_policy;

pub(crate) mod google {
    pub mod rpc;
    pub mod storage {
        pub mod v2;
    }
}

pub use error::Error;

/// The `Result` type returned by this crate's fallible operations.
pub type Result<T> = std::result::Result<T, Error>;
