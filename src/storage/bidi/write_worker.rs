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

//! Drives a single appendable write to completion (C3/C7).
//!
//! Unlike [super::worker], which serves a long-lived `ObjectDescriptor` and
//! must keep running in the background for as long as callers issue new
//! ranges, a write session has exactly one thing to do: stream the source
//! bytes to the service, observe it transition to a finalized object, and
//! return. There is no channel of incoming work: [Worker::run] owns the byte
//! source directly and the whole call is one bidi attempt sequence.

use super::write_connector::{Connection, Connector, WriteClient, WriteTonicStreaming};
use crate::error::{ChecksumMismatch, WriteError};
use crate::google::storage::v2::{BidiWriteObjectRequest, BidiWriteObjectResponse, ChecksummedData};
use crate::model::Object;
use crate::upload_source::{Seek, StreamingSource, WriteChunker};
use crate::{Error, Result};

/// Tracks everything a write attempt needs to know across reconnects:
/// how much has been durably persisted, how much has been sent but not
/// yet confirmed, and the running checksum of the bytes sent so far.
#[derive(Debug, Default)]
pub(super) struct WriteProgress {
    flush_interval: Option<u64>,
    bytes_sent: u64,
    bytes_since_last_flush: u64,
    persisted_size: u64,
    running_crc32c: u32,
    // Checkpoints of (offset, running_crc32c as of that offset), used to
    // rewind the running checksum after a failure. Pruned as persisted_size
    // advances, so this never grows past the in-flight (unconfirmed) bytes.
    checkpoints: Vec<(u64, u32)>,
    chunking_done: bool,
    finish_sent: bool,
    is_finalized: bool,
    resource: Option<Object>,
}

impl WriteProgress {
    fn new(flush_interval: Option<u64>) -> Self {
        Self {
            flush_interval,
            ..Self::default()
        }
    }

    fn adopt_persisted_size(&mut self, persisted: u64) -> Result<()> {
        if persisted < self.persisted_size {
            return Err(Error::write(WriteError::UnexpectedRewind {
                offset: self.persisted_size,
                persisted,
            }));
        }
        if persisted > self.bytes_sent {
            return Err(Error::write(WriteError::TooMuchProgress {
                sent: self.bytes_sent,
                persisted,
            }));
        }
        self.persisted_size = persisted;
        self.checkpoints.retain(|&(offset, _)| offset >= persisted);
        Ok(())
    }

    /// Applies `§4.7`'s per-response update: adopt `persisted_size`, adopt
    /// `resource.size` as `persisted_size`, and detect finalization.
    fn update_from_response(&mut self, response: &BidiWriteObjectResponse) -> Result<()> {
        if let Some(persisted) = response.persisted_size {
            self.adopt_persisted_size(persisted as u64)?;
        }
        if let Some(resource) = response.resource.as_ref() {
            self.adopt_persisted_size(resource.size as u64)?;
            if resource.finalize_time.is_some() {
                if let Some(want) = resource.checksums.as_ref().and_then(|c| c.crc32c) {
                    let got = self.running_crc32c;
                    if got != want {
                        return Err(Error::write(WriteError::ChecksumMismatch {
                            mismatch: ChecksumMismatch::Crc32c { got, want },
                            object: Box::new(resource.clone()),
                        }));
                    }
                }
                self.is_finalized = true;
            }
            self.resource = Some(resource.clone());
        }
        Ok(())
    }

    /// Records a chunk about to be sent at the current `bytes_sent` offset,
    /// advancing local bookkeeping and leaving a checkpoint to rewind to.
    fn record_chunk(&mut self, chunk: &[u8]) {
        self.running_crc32c = crc32c::crc32c_append(self.running_crc32c, chunk);
        self.bytes_sent += chunk.len() as u64;
        self.bytes_since_last_flush += chunk.len() as u64;
        self.checkpoints.push((self.bytes_sent, self.running_crc32c));
    }

    /// Unconditionally rewinds local progress to the last durable state, per
    /// `§4.7`'s failure recovery step 3.
    fn rewind_for_resume(&mut self) {
        let crc = self
            .checkpoints
            .iter()
            .rev()
            .find(|&&(offset, _)| offset <= self.persisted_size)
            .map(|&(_, crc)| crc)
            .unwrap_or_default();
        self.running_crc32c = crc;
        self.bytes_sent = self.persisted_size;
        self.bytes_since_last_flush = 0;
        self.checkpoints.retain(|&(offset, _)| offset <= self.persisted_size);
        // A resumed attempt always needs a leading state-lookup.
        self.chunking_done = false;
        self.finish_sent = false;
    }
}

/// The outcome of driving one bidi attempt to either completion or a
/// recoverable break.
enum DriveOutcome {
    Finalized(Object),
    Reconnect(tonic::Status),
}

#[derive(Debug)]
pub(super) struct Worker<C> {
    connector: Connector<C>,
}

impl<C> Worker<C>
where
    C: WriteClient + Clone + Send + 'static,
    <C as WriteClient>::Stream: WriteTonicStreaming + Send,
{
    pub(super) fn new(connector: Connector<C>) -> Self {
        Self { connector }
    }

    /// Streams `source` to completion, returning the finalized object.
    ///
    /// `initial` is the response already consumed while opening the stream
    /// (see [super::write_connector::Connector::connect]).
    pub(super) async fn run<S>(
        mut self,
        initial: BidiWriteObjectResponse,
        connection: Connection<C::Stream>,
        mut source: WriteChunker<S>,
        flush_interval: Option<u64>,
    ) -> Result<Object>
    where
        S: StreamingSource + Seek + Send,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let mut progress = WriteProgress::new(flush_interval);
        progress.update_from_response(&initial)?;
        let mut connection = connection;
        loop {
            match self.drive(&mut connection, &mut source, &mut progress).await? {
                DriveOutcome::Finalized(object) => return Ok(object),
                DriveOutcome::Reconnect(status) => {
                    let (response, _headers, new_connection) = self.connector.reconnect(status).await?;
                    connection = new_connection;
                    progress.update_from_response(&response)?;
                    source.seek(progress.persisted_size).await.map_err(|e| {
                        Error::write(WriteError::SeekFailed {
                            offset: progress.persisted_size,
                            source: Box::new(e),
                        })
                    })?;
                    progress.rewind_for_resume();
                }
            }
        }
    }

    /// Drives a single bidi attempt: sends the state-lookup/data/finish
    /// requests `§4.7` describes and consumes responses, interleaved so a
    /// mid-upload redirect or transport break is observed promptly.
    async fn drive<S>(
        &self,
        connection: &mut Connection<C::Stream>,
        source: &mut WriteChunker<S>,
        progress: &mut WriteProgress,
    ) -> Result<DriveOutcome>
    where
        S: StreamingSource + Seek + Send,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let mut pending = if self.connector.routing_token().is_some() {
            Some(BidiWriteObjectRequest {
                state_lookup: true,
                ..BidiWriteObjectRequest::default()
            })
        } else {
            None
        };

        loop {
            if pending.is_none() && !(progress.chunking_done && progress.finish_sent) {
                pending = Some(Self::next_request(source, progress).await?);
            }
            let Some(request) = pending.take() else {
                // Nothing left to send: just drain responses until the
                // service finalizes the object or the stream breaks.
                let msg = connection.rx.next_message().await;
                if let Some(outcome) = Self::handle_message(msg, progress)? {
                    return Ok(outcome);
                }
                continue;
            };
            tokio::select! {
                sent = connection.tx.send(request.clone()) => {
                    if sent.is_err() {
                        return Ok(DriveOutcome::Reconnect(Self::closed_status()));
                    }
                }
                msg = connection.rx.next_message() => {
                    // The send future didn't win the race; keep the request
                    // so it is retried on the next loop iteration. Sending to
                    // a bounded `mpsc::Sender` is cancel-safe: the message is
                    // never partially delivered.
                    pending = Some(request);
                    if let Some(outcome) = Self::handle_message(msg, progress)? {
                        return Ok(outcome);
                    }
                }
            }
        }
    }

    /// Builds the next outbound request: a data chunk while the source has
    /// bytes left, then exactly one terminal `finish_write` request once the
    /// source is exhausted (`§4.7` step 2, plus the close/finalize step `§8`
    /// describes for C3).
    async fn next_request<S>(
        source: &mut WriteChunker<S>,
        progress: &mut WriteProgress,
    ) -> Result<BidiWriteObjectRequest>
    where
        S: StreamingSource + Seek + Send,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        if !progress.chunking_done {
            match source.next_chunk().await {
                Some(Err(e)) => return Err(Error::io(e)),
                Some(Ok((chunk, is_last))) => {
                    let wire_crc32c = crc32c::crc32c(&chunk);
                    let offset = progress.bytes_sent;
                    progress.record_chunk(&chunk);
                    let mut request = BidiWriteObjectRequest {
                        write_offset: offset as i64,
                        checksummed_data: Some(ChecksummedData {
                            content: chunk,
                            crc32c: Some(wire_crc32c),
                        }),
                        ..BidiWriteObjectRequest::default()
                    };
                    if progress
                        .flush_interval
                        .is_some_and(|interval| progress.bytes_since_last_flush >= interval)
                    {
                        request.flush = true;
                        progress.bytes_since_last_flush = 0;
                    }
                    if is_last {
                        request.flush = true;
                        request.state_lookup = true;
                        progress.chunking_done = true;
                    }
                    return Ok(request);
                }
                None => progress.chunking_done = true,
            }
        }
        progress.finish_sent = true;
        Ok(BidiWriteObjectRequest {
            write_offset: progress.bytes_sent as i64,
            finish_write: true,
            state_lookup: true,
            ..BidiWriteObjectRequest::default()
        })
    }

    fn handle_message(
        message: tonic::Result<Option<BidiWriteObjectResponse>>,
        progress: &mut WriteProgress,
    ) -> Result<Option<DriveOutcome>> {
        match message {
            Ok(Some(response)) => {
                progress.update_from_response(&response)?;
                if progress.is_finalized {
                    let object = progress
                        .resource
                        .clone()
                        .ok_or_else(|| Error::deser("finalized response is missing a resource"))?;
                    return Ok(Some(DriveOutcome::Finalized(object)));
                }
                Ok(None)
            }
            Ok(None) => Ok(Some(DriveOutcome::Reconnect(Self::closed_status()))),
            Err(status) => Ok(Some(DriveOutcome::Reconnect(status))),
        }
    }

    /// A synthetic status for a stream that closed cleanly but before the
    /// write finished, mirroring `write_connector.rs`'s "stream closed
    /// before start" handling: treated as a plain transport error so the
    /// resume policy still gets a chance to retry it.
    fn closed_status() -> tonic::Status {
        tonic::Status::unknown("bidi_write_object stream closed before finalize")
    }
}
