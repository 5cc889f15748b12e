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

use super::active_read::ActiveRead;
use super::connector::{Connection, Connector};
use super::{Client, TonicStreaming};
use crate::error::ReadError;
use crate::google::storage::v2::{BidiReadObjectRequest, BidiReadObjectResponse, ObjectRangeData};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{Receiver, Sender};

type ReadResult<T> = std::result::Result<T, ReadError>;
type LoopResult<T> = std::result::Result<T, Arc<crate::Error>>;

#[derive(Debug)]
pub struct Worker<C> {
    next_range_id: i64,
    ranges: Arc<Mutex<HashMap<i64, ActiveRead>>>,
    connector: Connector<C>,
}

impl<C> Worker<C> {
    pub fn new(connector: Connector<C>) -> Self {
        let ranges = Arc::new(Mutex::new(HashMap::new()));
        Self {
            next_range_id: 0_i64,
            ranges,
            connector,
        }
    }
}

impl<C> Worker<C>
where
    C: Client + Clone + 'static,
    <C as Client>::Stream: TonicStreaming,
{
    pub async fn run(
        mut self,
        connection: Connection<C::Stream>,
        mut requests: Receiver<Vec<ActiveRead>>,
    ) -> LoopResult<()> {
        let (mut rx, mut tx) = (connection.rx, connection.tx);
        // Note how this loop only exits when the `requests` queue is
        // closed. A successfully closed stream and unrecoverable errors
        // return immediately.
        loop {
            tokio::select! {
                m = rx.next_message() => {
                    match self.handle_response(m).await {
                        // Successful end of stream, return without error.
                        None => return Ok(()),
                        // An unrecoverable in the stream or its data, return
                        // the error.
                        Some(Err(e)) => return Err(e),
                        // New message on the stream handled successfully,
                        // continue.
                        Some(Ok(None)) => {},
                        // The stream reconnected successfully, update the local
                        // variables and continue.
                        Some(Ok(Some(connection))) => {
                            (rx, tx) = (connection.rx, connection.tx);
                        }
                    };
                },
                r = requests.recv() => {
                    let Some(batch) = r else {
                        break;
                    };
                    self.insert_ranges(tx.clone(), batch).await;
                },
            }
        }
        // No need to continue reading. The `requests` queue closes
        // only when the ObjectDescriptor is gone and when all the
        // associated ReadResponseReaders are gone.
        Ok(())
    }

    async fn handle_response(
        &mut self,
        message: tonic::Result<Option<BidiReadObjectResponse>>,
    ) -> Option<LoopResult<Option<Connection<C::Stream>>>> {
        let response = match message.transpose()? {
            Ok(r) => r,
            Err(status) => return self.reconnect(status).await,
        };

        if let Err(e) = self.handle_ranges(response.object_data_ranges).await {
            // An error in the response. These are not recoverable.
            let error = Arc::new(e);
            self.close_readers(error.clone()).await;
            return Some(Err(error));
        }
        Some(Ok(None))
    }

    async fn handle_ranges(&self, data: Vec<ObjectRangeData>) -> crate::Result<()> {
        let mut result = Ok(());
        // TODO(#3848) - maybe parallelize this loop, as long as each range_id group is serialized.
        for response in data {
            if let Err(e) = Self::handle_range_data(self.ranges.clone(), response).await {
                // Capture the first error. An error here is rare, it indicates
                // service sent an invalid response. Trying to capture all the
                // failures is too much complexity for something that may never
                // happen.
                result = result.and(Err(e));
            }
        }
        // TODO(#3626) - reconsider the error kind.
        result.map_err(crate::Error::io)
    }

    async fn reconnect(
        &mut self,
        status: tonic::Status,
    ) -> Option<LoopResult<Option<Connection<C::Stream>>>> {
        let ranges: Vec<_> = self
            .ranges
            .lock()
            .await
            .iter()
            .map(|(id, r)| r.as_proto(*id))
            .collect();
        let (response, connection) = match self.connector.reconnect(status, ranges).await {
            Err(e) => {
                let error = Arc::new(e);
                self.close_readers(error.clone()).await;
                return Some(Err(error));
            }
            Ok((m, _headers, connection)) => (m, connection),
        };
        if let Err(e) = self.handle_ranges(response.object_data_ranges).await {
            // An error in the response. These are not recoverable.
            // TODO: refactor to handle_ranges().
            let error = Arc::new(e);
            self.close_readers(error.clone()).await;
            return Some(Err(error));
        }
        Some(Ok(Some(connection)))
    }

    async fn close_readers(&mut self, error: Arc<crate::Error>) {
        use futures::StreamExt;
        let mut guard = self.ranges.lock().await;
        let closing = futures::stream::FuturesUnordered::new();
        for (_, active) in guard.iter_mut() {
            closing.push(active.interrupted(error.clone()));
        }
        let _ = closing.count().await;
    }

    /// Inserts a batch of ranges and sends them as a single
    /// `BidiReadObjectRequest` (`§4.4`: callers shard a multi-range request
    /// into batches of at most 100 before handing them to the worker).
    async fn insert_ranges(&mut self, tx: Sender<BidiReadObjectRequest>, batch: Vec<ActiveRead>) {
        let mut read_ranges = Vec::with_capacity(batch.len());
        let mut guard = self.ranges.lock().await;
        for reader in batch {
            let id = self.next_range_id;
            self.next_range_id += 1;
            read_ranges.push(reader.as_proto(id));
            guard.insert(id, reader);
        }
        drop(guard);
        let request = BidiReadObjectRequest {
            read_ranges,
            ..BidiReadObjectRequest::default()
        };
        // If this fails the main loop will reconnect the stream and include the
        // newly inserted ranges in the initial request to resume all the ranged
        // reads.
        if let Err(e) = tx.send(request).await {
            tracing::error!("error sending read range request: {e:?}");
        }
    }

    async fn handle_range_data(
        ranges: Arc<Mutex<HashMap<i64, ActiveRead>>>,
        response: ObjectRangeData,
    ) -> ReadResult<()> {
        let range = response
            .read_range
            .ok_or(ReadError::MissingRangeInBidiResponse)?;
        let handler = if response.range_end {
            let mut pending = ranges
                .lock()
                .await
                .remove(&range.read_id)
                .ok_or(ReadError::UnknownBidiRangeId(range.read_id))?;
            pending.handle_data(response.checksummed_data, range, true)?
        } else {
            let mut guard = ranges.lock().await;
            let pending = guard
                .get_mut(&range.read_id)
                .ok_or(ReadError::UnknownBidiRangeId(range.read_id))?;
            pending.handle_data(response.checksummed_data, range, false)?
        };
        handler.send().await;
        Ok(())
    }
}
