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

//! Shared write-side test fixtures, mirroring [super::mocks] and the
//! read-side fixtures in [super::tests].

use super::write_connector::{Connector, WriteClient, WriteSessionSpec, WriteTonicStreaming};
use crate::google::rpc::Status as RpcStatus;
use crate::google::storage::v2::{
    BidiWriteHandle, BidiWriteObjectRedirectedError, BidiWriteObjectRequest,
    BidiWriteObjectResponse,
};
use crate::request_options::RequestOptions;
use prost::Message as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{Receiver, Sender};
use tonic::{Extensions, Response as TonicResponse, Result as TonicResult};

/// Per-test request options with a fast exponential backoff, mirroring
/// [super::tests::test_options].
pub(super) fn test_write_options() -> RequestOptions {
    let mut options = RequestOptions::new();
    options.backoff_policy = Arc::new(test_backoff());
    options
}

fn test_backoff() -> impl crate::backoff_policy::BackoffPolicy {
    crate::backoff_policy::ExponentialBackoffBuilder::new()
        .with_initial_delay(Duration::from_micros(1))
        .with_maximum_delay(Duration::from_micros(1))
        .build()
        .expect("a valid backoff policy")
}

pub(super) fn permanent_write_error() -> crate::Error {
    crate::Error::rpc(tonic::Status::permission_denied("uh-oh"))
}

pub(super) fn redirect_write_status(routing: &str) -> tonic::Status {
    let redirect = BidiWriteObjectRedirectedError {
        routing_token: routing.to_string(),
        write_handle: Some(BidiWriteHandle {
            handle: bytes::Bytes::from_static(b"handle"),
        }),
    };
    let redirect = prost_types::Any::from_msg(&redirect).unwrap();
    let status = RpcStatus {
        code: tonic::Code::Aborted as i32,
        message: "redirect".to_string(),
        details: vec![redirect],
    };
    let details = bytes::Bytes::from_owner(status.encode_to_vec());
    tonic::Status::with_details(tonic::Code::Aborted, "redirect", details)
}

// mockall mocks are not `Clone`, and the connector needs a `Clone` client.
#[derive(Clone, Debug)]
pub(super) struct SharedMockWriteClient(pub(super) Arc<MockTestWriteClient>);

impl SharedMockWriteClient {
    pub(super) fn new(mock: MockTestWriteClient) -> Self {
        Self(Arc::new(mock))
    }
}

impl WriteClient for SharedMockWriteClient {
    type Stream = MockWriteStream;

    async fn start(
        &self,
        extensions: Extensions,
        path: http::uri::PathAndQuery,
        rx: Receiver<BidiWriteObjectRequest>,
        options: &RequestOptions,
        api_client_header: &'static str,
        request_params: &str,
    ) -> crate::Result<TonicResult<TonicResponse<Self::Stream>>> {
        self.0.start(
            extensions,
            path,
            rx,
            options,
            api_client_header,
            request_params,
        )
    }
}

impl WriteTonicStreaming for Receiver<TonicResult<BidiWriteObjectResponse>> {
    async fn next_message(&mut self) -> TonicResult<Option<BidiWriteObjectResponse>> {
        self.recv().await.transpose()
    }
}

#[mockall::automock]
pub(super) trait TestWriteClient: std::fmt::Debug {
    fn start(
        &self,
        extensions: Extensions,
        path: http::uri::PathAndQuery,
        rx: Receiver<BidiWriteObjectRequest>,
        options: &RequestOptions,
        api_client_header: &'static str,
        request_params: &str,
    ) -> crate::Result<TonicResult<TonicResponse<MockWriteStream>>>;
}

pub(super) type MockWriteStream = Receiver<TonicResult<BidiWriteObjectResponse>>;
pub(super) type MockWriteStreamSender = Sender<TonicResult<BidiWriteObjectResponse>>;

pub(super) fn mock_write_connector(
    mock: MockTestWriteClient,
) -> Connector<SharedMockWriteClient> {
    let client = SharedMockWriteClient::new(mock);
    let session = WriteSessionSpec {
        bucket: "projects/_/buckets/test-bucket".into(),
        object: "test-object".into(),
        ..WriteSessionSpec::default()
    };
    Connector::new(session, test_write_options(), client)
}

pub(super) fn mock_write_stream() -> (MockWriteStreamSender, MockWriteStream) {
    tokio::sync::mpsc::channel(10)
}
