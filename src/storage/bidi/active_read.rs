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

use super::remaining_range::RemainingRange;
use crate::error::{ChecksumMismatch, ReadError};
use crate::google::storage::v2::{ChecksummedData, ReadRange as ProtoRange};
use crate::model_ext::RequestedRange;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;

type ReadResult<T> = std::result::Result<T, ReadError>;

#[derive(Debug)]
pub(crate) struct ActiveRead {
    state: RemainingRange,
    sender: Sender<ReadResult<bytes::Bytes>>,
}

impl ActiveRead {
    pub(super) fn new(
        sender: Sender<ReadResult<bytes::Bytes>>,
        requested_range: RequestedRange,
    ) -> Self {
        Self {
            sender,
            state: RemainingRange::Requested(requested_range),
        }
    }

    pub(super) fn handle_data(
        &mut self,
        data: Option<ChecksummedData>,
        received_range: ProtoRange,
        end: bool,
    ) -> ReadResult<Handler> {
        self.state.update(received_range)?;
        let Some(data) = data else {
            self.state.handle_empty(end)?;
            return Ok(Handler(InnerHandler::NoData));
        };
        if let Some(want) = data.crc32c {
            let got = crc32c::crc32c(&data.content);
            if want != got {
                return Err(ReadError::ChecksumMismatch(ChecksumMismatch::Crc32c {
                    got,
                    want,
                }));
            }
        };
        Ok(Handler(InnerHandler::Send(
            self.sender.clone(),
            data.content,
        )))
    }

    pub(super) async fn handle_error(&mut self, error: ReadError) {
        if let Err(e) = self.sender.send(Err(error)).await {
            tracing::error!("cannot notify reader (dropped?) about: {e:?}");
        }
    }

    pub(super) async fn interrupted(&mut self, error: Arc<crate::Error>) {
        if let Err(e) = self
            .sender
            .send(Err(ReadError::UnrecoverableBidiReadInterrupt(error)))
            .await
        {
            tracing::error!("cannot notify reader (dropped?) about: {e:?}");
        }
    }

    pub(super) fn as_proto(&self, id: i64) -> ProtoRange {
        self.state.as_proto(id)
    }
}

#[derive(Debug)]
pub struct Handler(InnerHandler);
impl Handler {
    pub async fn send(self) {
        match self.0 {
            InnerHandler::NoData => {}
            InnerHandler::Send(tx, data) => {
                // Ignore errors, the application can drop the reader (which
                // holds the other side of the `tx` channel) at any time.
                let _ = tx.send(Ok(data)).await;
            }
        }
    }
}

#[derive(Debug)]
enum InnerHandler {
    NoData,
    Send(Sender<ReadResult<bytes::Bytes>>, bytes::Bytes),
}
