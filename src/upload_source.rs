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

//! Defines upload data sources.

/// The payload for an appendable write, e.g.
/// [AppendObject::send][crate::storage::bidi::AppendObject::send].
///
/// A write consumes any type that can be converted to this type. That
/// includes simple buffers, and any type implementing [StreamingSource].
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// # use gcs_bidi_streams::upload_source::InsertPayload;
/// use gcs_bidi_streams::upload_source::StreamingSource;
/// let buffer : &[u8] = b"the quick brown fox jumps over the lazy dog";
/// let mut size = 0_usize;
/// let mut payload = InsertPayload::from(buffer);
/// while let Some(bytes) = payload.next().await.transpose()? {
///     size += bytes.len();
/// }
/// assert_eq!(size, buffer.len());
/// # anyhow::Result::<()>::Ok(()) });
/// ```
pub struct InsertPayload<T> {
    payload: T,
}

impl<T> StreamingSource for InsertPayload<T>
where
    T: StreamingSource,
{
    type Error = T::Error;

    fn next(&mut self) -> impl Future<Output = Option<Result<bytes::Bytes, Self::Error>>> + Send {
        self.payload.next()
    }

    fn size_hint(&self) -> (u64, Option<u64>) {
        self.payload.size_hint()
    }
}

impl<T> Seek for InsertPayload<T>
where
    T: Seek,
{
    type Error = T::Error;

    fn seek(&mut self, offset: u64) -> impl Future<Output = Result<(), Self::Error>> + Send {
        self.payload.seek(offset)
    }
}

impl From<bytes::Bytes> for InsertPayload<BytesSource> {
    fn from(value: bytes::Bytes) -> Self {
        let payload = BytesSource::new(value);
        Self { payload }
    }
}

impl From<&'static str> for InsertPayload<BytesSource> {
    fn from(value: &'static str) -> Self {
        let b = bytes::Bytes::from_static(value.as_bytes());
        InsertPayload::from(b)
    }
}

impl From<&'static [u8]> for InsertPayload<BytesSource> {
    fn from(value: &'static [u8]) -> Self {
        let b = bytes::Bytes::from_static(value);
        InsertPayload::from(b)
    }
}

impl<S> From<S> for InsertPayload<S>
where
    S: StreamingSource + Seek,
{
    fn from(value: S) -> Self {
        Self { payload: value }
    }
}

/// Provides bytes for an upload from single-pass sources.
pub trait StreamingSource {
    /// The error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Gets the next set of data to upload.
    fn next(&mut self) -> impl Future<Output = Option<Result<bytes::Bytes, Self::Error>>> + Send;

    /// An estimate of the upload size.
    ///
    /// Returns the expected size as a [min, max) range. Where `None` represents
    /// an unknown limit for the upload.
    ///
    /// If the upper limit is known and sufficiently small, the client library
    /// may be able to use a more efficient protocol for the upload.
    fn size_hint(&self) -> (u64, Option<u64>) {
        (0_u64, None)
    }
}

/// Provides bytes for an upload from sources that support seek.
///
/// Implementations of this trait provide data for Google Cloud Storage uploads.
/// The data may be received asynchronously, such as downloads from Google Cloud
/// Storage, other remote storage systems, or the result of repeatable
/// computations.
pub trait Seek {
    /// The error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resets the stream to start from `offset`.
    ///
    /// The client library automatically restarts uploads when the connection
    /// is reset or there is some kind of partial failure. Resuming an upload
    /// may require resetting the stream to an arbitrary point.
    ///
    /// The client library assumes that `seek(N)` followed by `next()` always
    /// returns the same data.
    fn seek(&mut self, offset: u64) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

const READ_SIZE: usize = 256 * 1024;

impl<S> StreamingSource for S
where
    S: tokio::io::AsyncRead + Unpin + Send,
{
    type Error = std::io::Error;

    async fn next(&mut self) -> Option<Result<bytes::Bytes, Self::Error>> {
        let mut buffer = vec![0_u8; READ_SIZE];
        match tokio::io::AsyncReadExt::read(self, &mut buffer).await {
            Err(e) => Some(Err(e)),
            Ok(0) => None,
            Ok(n) => {
                buffer.resize(n, 0_u8);
                Some(Ok(bytes::Bytes::from_owner(buffer)))
            }
        }
    }
}

impl<S> Seek for S
where
    S: tokio::io::AsyncSeek + Unpin + Send,
{
    type Error = std::io::Error;

    async fn seek(&mut self, offset: u64) -> Result<(), Self::Error> {
        let _ = tokio::io::AsyncSeekExt::seek(self, std::io::SeekFrom::Start(offset)).await?;
        Ok(())
    }
}

/// Wrap a `bytes::Bytes` to support `StreamingSource`.
pub struct BytesSource {
    contents: bytes::Bytes,
    current: Option<bytes::Bytes>,
}

impl BytesSource {
    pub(crate) fn new(contents: bytes::Bytes) -> Self {
        let current = Some(contents.clone());
        Self { contents, current }
    }
}

impl StreamingSource for BytesSource {
    type Error = crate::Error;

    async fn next(&mut self) -> Option<Result<bytes::Bytes, Self::Error>> {
        self.current.take().map(Result::Ok)
    }

    fn size_hint(&self) -> (u64, Option<u64>) {
        let s = self.contents.len() as u64;
        (s, Some(s))
    }
}

impl Seek for BytesSource {
    type Error = crate::Error;

    async fn seek(&mut self, offset: u64) -> Result<(), Self::Error> {
        let pos = std::cmp::min(offset as usize, self.contents.len());
        self.current = Some(self.contents.slice(pos..));
        Ok(())
    }
}

/// Buffers a [StreamingSource] into fixed-size chunks for the appendable
/// write protocol (`§4.7`), and reports whether each chunk is the last one
/// the source has to offer.
///
/// [StreamingSource::next] only tells us "here is some data" or "the source
/// is exhausted"; it has no `peek()`. To know a chunk is the *last* one
/// before sending it (so the write request can set `finish_write` without an
/// extra round trip) this buffers one chunk ahead: it keeps pulling from the
/// source until it has strictly more than `chunk_size` bytes buffered, or
/// the source is exhausted, before it can conclusively label a chunk.
pub(crate) struct WriteChunker<S> {
    source: S,
    buffer: bytes::BytesMut,
    chunk_size: usize,
    exhausted: bool,
}

impl<S> WriteChunker<S>
where
    S: StreamingSource + Seek,
{
    pub(crate) fn new(source: S, chunk_size: usize) -> Self {
        Self {
            source,
            buffer: bytes::BytesMut::new(),
            chunk_size,
            exhausted: false,
        }
    }

    /// Returns the next chunk and whether it is the last chunk the source
    /// will produce. Returns `None` once the source is exhausted and every
    /// buffered byte has been returned.
    pub(crate) async fn next_chunk(&mut self) -> Option<Result<(bytes::Bytes, bool), S::Error>> {
        while !self.exhausted && self.buffer.len() <= self.chunk_size {
            match self.source.next().await {
                None => self.exhausted = true,
                Some(Ok(bytes)) => self.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => return Some(Err(e)),
            }
        }
        if self.buffer.is_empty() {
            return None;
        }
        let take = std::cmp::min(self.chunk_size, self.buffer.len());
        let chunk = self.buffer.split_to(take).freeze();
        let is_last = self.exhausted && self.buffer.is_empty();
        Some(Ok((chunk, is_last)))
    }

    /// Discards any buffered data and seeks the underlying source, e.g. to
    /// rewind to the offset the service last reported as persisted.
    pub(crate) async fn seek(&mut self, offset: u64) -> Result<(), S::Error> {
        self.buffer.clear();
        self.exhausted = false;
        self.source.seek(offset).await
    }
}
