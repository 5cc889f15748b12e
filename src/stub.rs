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

//! Public mocking surface.
//!
//! Application developers implement these traits (with the help of
//! `mockall` or similar) to unit test code that uses [ObjectDescriptor].
//!
//! [ObjectDescriptor]: crate::object_descriptor::ObjectDescriptor

use crate::model::Object;
use crate::model_ext::ReadRange;
use crate::read_object::ReadObjectResponse;
use http::HeaderMap;

/// Defines the trait used to implement [ObjectDescriptor][crate::object_descriptor::ObjectDescriptor].
///
/// Application developers may need to implement this trait to mock
/// the successful path and error conditions when testing their own code.
///
/// # Example
/// ```
/// # use gcs_bidi_streams::Result;
/// # use gcs_bidi_streams::model::Object;
/// # use gcs_bidi_streams::model_ext::ReadRange;
/// # use gcs_bidi_streams::read_object::ReadObjectResponse;
/// # use http::HeaderMap;
/// # use mockall::mock;
/// mock! {
///     #[derive(Debug)]
///     Descriptor {}
///     impl gcs_bidi_streams::stub::ObjectDescriptor for Descriptor {
///         fn object(&self) -> Object;
///         async fn read_range(&self, range: ReadRange) -> ReadObjectResponse;
///         async fn read_ranges(&self, ranges: Vec<ReadRange>) -> Result<Vec<ReadObjectResponse>>;
///         fn headers(&self) -> HeaderMap;
///     }
/// }
/// ```
pub trait ObjectDescriptor: std::fmt::Debug + Send + Sync {
    /// Returns the metadata for the opened object.
    fn object(&self) -> Object;

    /// Start reading a range.
    async fn read_range(&self, range: ReadRange) -> ReadObjectResponse;

    /// Start reading up to 1000 ranges at once, sharding them into batches of
    /// at most 100 outgoing `read_ranges` per request (`§4.4`).
    ///
    /// Returns one [ReadObjectResponse] per input range, in the same order.
    /// Fails with [Error::is_invalid_argument][crate::Error::is_invalid_argument]
    /// without opening or touching the stream if `ranges` has more than 1000
    /// entries.
    async fn read_ranges(&self, ranges: Vec<ReadRange>) -> crate::Result<Vec<ReadObjectResponse>>;

    /// Returns the response headers from the RPC that opened the object.
    fn headers(&self) -> HeaderMap;
}
