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

//! Defines the return type for [crate::storage::bidi::OpenObject::send].

use crate::model::Object;
use crate::model_ext::ReadRange;
use crate::read_object::ReadObjectResponse;
use crate::storage::bidi::stub::dynamic::ObjectDescriptor as ObjectDescriptorStub;

/// The `open_object()` metadata attributes.
pub use http::HeaderMap;

/// An open object ready to read one or more ranges.
///
/// # Example
/// ```ignore
/// # use gcs_bidi_streams::object_descriptor::ObjectDescriptor;
/// use gcs_bidi_streams::model_ext::ReadRange;
/// # async fn sample(open: ObjectDescriptor) -> anyhow::Result<()> {
/// println!("metadata = {:?}", open.object());
/// // Read 2000 bytes starting at offset 1000.
/// let mut reader = open.read_range(ReadRange::segment(1000, 2000)).await;
/// while let Some(data) = reader.next().await.transpose()? {
///   println!("received {} bytes", data.len());
/// }
/// # Ok(()) }
/// ```
///
/// This is analogous to a "file descriptor". It represents an object in Cloud
/// Storage that has been "opened" and is ready for more read operations. An
/// object descriptor can have multiple concurrent read operations at a time.
/// You may call `read_range()` even if previous reads have not completed.
///
/// There are no guarantees about the order of the responses. All the data for
/// a `read_range()` may be returned before any data of earlier `read_range()`
/// calls, or the data may arrive in any interleaved order. Naturally, the data
/// for a single ranged read arrives in order.
///
/// You should actively read from all concurrent reads: the client library uses
/// separate buffers for each `read_range()` call, but once a buffer is full the
/// library will stop delivering data to **all** the concurrent reads.
#[derive(Debug)]
pub struct ObjectDescriptor {
    inner: Box<dyn ObjectDescriptorStub>,
}

impl ObjectDescriptor {
    /// Returns the metadata for the open object.
    ///
    /// # Example
    /// ```
    /// # use gcs_bidi_streams::object_descriptor::ObjectDescriptor;
    /// # async fn sample() -> anyhow::Result<()> {
    /// let descriptor = open();
    /// println!("object generation = {}", descriptor.object().generation);
    ///
    /// fn open() -> ObjectDescriptor {
    /// # panic!()
    /// // ... details omitted ...
    /// }
    /// # Ok(()) }
    /// ```
    ///
    pub fn object(&self) -> Object {
        self.inner.object()
    }

    /// Start reading a range.
    ///
    /// # Example
    /// ```
    /// # use gcs_bidi_streams::object_descriptor::ObjectDescriptor;
    /// use gcs_bidi_streams::{model_ext::ReadRange, read_object::ReadObjectResponse};
    /// # async fn sample() -> anyhow::Result<()> {
    /// const MIB: u64 = 1024 * 1024;
    /// let descriptor = open();
    /// println!("object generation = {}", descriptor.object().generation);
    ///
    /// // Read 2 MiB starting at offset 0.
    /// let read1 = descriptor.read_range(ReadRange::segment(0, 2 * MIB)).await;
    /// // Concurrently read 2 MiB starting at offset 4 MiB.
    /// let read2 = descriptor.read_range(ReadRange::segment(4 * MIB, 2 * MIB)).await;
    ///
    /// let t1 = tokio::spawn(async move { do_read(read1) });
    /// let t2 = tokio::spawn(async move { do_read(read2) });
    ///
    /// async fn do_read(mut reader: ReadObjectResponse) {
    /// # panic!()
    /// // ... details omitted ...
    /// }
    /// fn open() -> ObjectDescriptor {
    /// # panic!()
    /// // ... details omitted ...
    /// }
    /// # Ok(()) }
    /// ```
    pub async fn read_range(&self, range: ReadRange) -> ReadObjectResponse {
        self.inner.read_range(range).await
    }

    /// Start reading up to 1000 ranges at once (`§4.4`).
    ///
    /// Internally the ranges are sharded into batches of at most 100,
    /// each shipped as a single outgoing read request; the returned
    /// readers are in the same order as `ranges`. Fails with
    /// [Error::is_invalid_argument][crate::Error::is_invalid_argument],
    /// without opening or touching the stream, if `ranges` has more than
    /// 1000 entries.
    ///
    /// # Example
    /// ```
    /// # use gcs_bidi_streams::object_descriptor::ObjectDescriptor;
    /// use gcs_bidi_streams::model_ext::ReadRange;
    /// # async fn sample(open: ObjectDescriptor) -> anyhow::Result<()> {
    /// let readers = open
    ///     .read_ranges(vec![ReadRange::segment(0, 100), ReadRange::segment(100, 100)])
    ///     .await?;
    /// # Ok(()) }
    /// ```
    pub async fn read_ranges(&self, ranges: Vec<ReadRange>) -> crate::Result<Vec<ReadObjectResponse>> {
        self.inner.read_ranges(ranges).await
    }

    /// Returns metadata about the original `open_object()` request.
    ///
    /// # Example
    /// ```
    /// # use gcs_bidi_streams::object_descriptor::ObjectDescriptor;
    /// # async fn sample() -> anyhow::Result<()> {
    /// let descriptor = open();
    /// // Often useful when troubleshooting problems with Google Support.
    /// let header = descriptor.headers().get("x-guploader-uploadid");
    /// println!("debugging header = {:?}", header);
    ///
    /// fn open() -> ObjectDescriptor {
    /// # panic!()
    /// // ... details omitted ...
    /// }
    /// # Ok(()) }
    /// ```
    pub fn headers(&self) -> HeaderMap {
        self.inner.headers()
    }

    /// Create a new instance.
    ///
    /// Application developers should only need to create an `ObjectDescriptor`
    /// in unit tests.
    pub fn new<T>(inner: T) -> Self
    where
        T: crate::stub::ObjectDescriptor + 'static,
    {
        Self {
            inner: Box::new(inner),
        }
    }
}
