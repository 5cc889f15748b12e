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
use super::range_reader::RangeReader;
use crate::error::ReadError;
use crate::model::Object;
use crate::model_ext::ReadRange;
use crate::read_object::ReadObjectResponse;
use crate::stub::ObjectDescriptor;
use crate::{Error, Result};
use http::HeaderMap;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;

type ReadResult<T> = std::result::Result<T, ReadError>;

/// The maximum number of ranges a single [ObjectDescriptor::read_ranges] call
/// accepts (`§4.4`).
const MAX_RANGES_PER_CALL: usize = 1000;

/// The maximum number of ranges shipped in a single outgoing
/// `BidiReadObjectRequest` (`§4.4`).
const MAX_RANGES_PER_REQUEST: usize = 100;

#[derive(Debug)]
pub struct ObjectDescriptorTransport {
    object: Arc<Object>,
    headers: HeaderMap,
    tx: Sender<Vec<ActiveRead>>,
}

impl ObjectDescriptorTransport {
    pub async fn new<T>(mut connector: super::connector::Connector<T>) -> Result<Self>
    where
        T: super::Client + Clone + Sync,
        <T as super::Client>::Stream: super::TonicStreaming + Send + Sync,
    {
        use gaxi::prost::FromProto;

        let (tx, rx) = tokio::sync::mpsc::channel(100);
        let (initial, headers, connection) = connector.connect(Vec::new()).await?;
        let object = FromProto::cnv(initial.metadata.ok_or_else(|| {
            Error::deser("initial response in bidi read must contain object metadata")
        })?)
        .expect("transforming from proto Object never fails");
        let object = Arc::new(object);
        let worker = super::worker::Worker::new(connector);
        let _handle = tokio::spawn(worker.run(connection, rx));
        Ok(Self {
            object,
            headers,
            tx,
        })
    }
}

impl ObjectDescriptor for ObjectDescriptorTransport {
    fn object(&self) -> Object {
        // self.object is Arc<Object>, calling `.clone()` directly would clone
        // the `Arc<>`. Calling `.as_ref()` returns `&Object` and then we can
        // clone.
        self.object.as_ref().clone()
    }

    async fn read_range(&self, range: ReadRange) -> ReadObjectResponse {
        let (tx, rx) = tokio::sync::mpsc::channel(100);
        let range = ActiveRead::new(tx, range.0);
        self.tx
            .send(vec![range])
            .await
            .expect("worker never exits while ObjectDescriptor is live");
        ReadObjectResponse::new(Box::new(RangeReader::new(
            rx,
            self.object.clone(),
            self.tx.clone(),
        )))
    }

    async fn read_ranges(&self, ranges: Vec<ReadRange>) -> Result<Vec<ReadObjectResponse>> {
        if ranges.len() > MAX_RANGES_PER_CALL {
            return Err(Error::invalid_argument(format!(
                "too many ranges: got {}, the maximum is {MAX_RANGES_PER_CALL}",
                ranges.len()
            )));
        }
        let mut readers = Vec::with_capacity(ranges.len());
        for chunk in ranges.chunks(MAX_RANGES_PER_REQUEST) {
            let mut batch = Vec::with_capacity(chunk.len());
            for range in chunk {
                let (tx, rx) = tokio::sync::mpsc::channel(100);
                batch.push(ActiveRead::new(tx, range.0));
                readers.push(ReadObjectResponse::new(Box::new(RangeReader::new(
                    rx,
                    self.object.clone(),
                    self.tx.clone(),
                ))));
            }
            self.tx
                .send(batch)
                .await
                .expect("worker never exits while ObjectDescriptor is live");
        }
        Ok(readers)
    }

    fn headers(&self) -> HeaderMap {
        self.headers.clone()
    }
}
