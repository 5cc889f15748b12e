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

use super::write_redirect::handle_write_redirect;
use super::write_resume_redirect::WriteResumeRedirect;
use super::write_retry_redirect::WriteRetryRedirect;
use crate::backoff_policy::BackoffPolicy;
use crate::google::storage::v2::{
    AppendObjectSpec, BidiWriteHandle, BidiWriteObjectRequest, BidiWriteObjectResponse,
    CommonObjectRequestParams, FirstWriteMessage, Object, WriteObjectSpec,
};
use crate::request_options::RequestOptions;
use crate::retry_policy::{RetryPolicy, RetryResult};
use crate::storage::info::X_GOOG_API_CLIENT_HEADER;
use crate::write_resume_policy::{ResumeQuery, ResumeResult, WriteResumePolicy};
use crate::{Error, Result};
use gaxi::grpc::Client as GrpcClient;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc::{Receiver, Sender};

/// The mutable state a write session carries across reconnects: the target
/// object, whatever routing/handle the service has issued so far, and
/// whether the `BidiWriteObject` stream has ever been opened successfully.
///
/// The first successful open (`opened == false`) uses a [WriteObjectSpec] to
/// create the appendable object; every subsequent reconnect (`opened ==
/// true`) uses an [AppendObjectSpec] to resume it (`§4.3`).
#[derive(Clone, Debug, Default)]
pub struct WriteSessionSpec {
    pub bucket: String,
    pub object: String,
    pub generation: i64,
    pub write_handle: Option<BidiWriteHandle>,
    pub routing_token: Option<String>,
    pub common_object_request_params: Option<CommonObjectRequestParams>,
    pub opened: bool,
}

/// Mirrors [super::connector::retry_loop], retrying only the stream-open RPC.
async fn retry_loop<F, Response>(
    mut inner: F,
    retry_policy: Arc<dyn RetryPolicy>,
    backoff_policy: Arc<dyn BackoffPolicy>,
    retry_throttler: crate::retry_throttler::SharedRetryThrottler,
) -> Result<Response>
where
    F: AsyncFnMut() -> Result<Response> + Send,
{
    let loop_start = Instant::now();
    let mut attempt_count = 0_u32;
    loop {
        attempt_count += 1;
        match inner().await {
            Ok(response) => {
                retry_throttler
                    .lock()
                    .expect("retry throttler lock is poisoned")
                    .on_success();
                return Ok(response);
            }
            Err(error) => {
                let result = retry_policy.on_error(loop_start, attempt_count, error);
                retry_throttler
                    .lock()
                    .expect("retry throttler lock is poisoned")
                    .on_retry_failure(&result);
                match result {
                    RetryResult::Continue(e) => {
                        let allowed = retry_throttler
                            .lock()
                            .expect("retry throttler lock is poisoned")
                            .throttle_retry_attempt();
                        if !allowed {
                            return Err(e);
                        }
                        let delay = backoff_policy.on_failure(loop_start, attempt_count);
                        tokio::time::sleep(delay).await;
                    }
                    RetryResult::Exhausted(e) | RetryResult::Permanent(e) => return Err(e),
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct Connection<S = tonic::Streaming<BidiWriteObjectResponse>> {
    pub tx: Sender<BidiWriteObjectRequest>,
    pub rx: S,
}

impl<S> Connection<S> {
    pub fn new(tx: Sender<BidiWriteObjectRequest>, rx: S) -> Self {
        Self { tx, rx }
    }
}

/// Establishes connections to gRPC for bidi streaming writes.
#[derive(Clone, Debug)]
pub struct Connector<T = GrpcClient> {
    session: Arc<Mutex<WriteSessionSpec>>,
    options: RequestOptions,
    // This is used in testing, the client library always uses `GrpcClient`.
    client: T,
    reconnect_attempts: u32,
}

/// The response headers a bidi write stream's opening RPC returned.
type OpenHeaders = http::HeaderMap;

impl<T> Connector<T>
where
    T: WriteClient + Clone + Send + 'static,
    <T as WriteClient>::Stream: WriteTonicStreaming,
{
    pub fn new(session: WriteSessionSpec, options: RequestOptions, client: T) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            options,
            client,
            reconnect_attempts: 0_u32,
        }
    }

    /// The routing token the session has been asked to use, if any.
    ///
    /// The per-attempt algorithm (`§4.7`) uses this to decide whether it must
    /// issue a bare state-lookup request before resuming data transfer.
    pub fn routing_token(&self) -> Option<String> {
        self.session
            .lock()
            .expect("never poisoned")
            .routing_token
            .clone()
    }

    pub async fn connect(
        &mut self,
    ) -> Result<(BidiWriteObjectResponse, OpenHeaders, Connection<T::Stream>)> {
        let throttler = self.options.retry_throttler.clone();
        let retry: Arc<dyn RetryPolicy> =
            Arc::new(WriteRetryRedirect::new(self.options.retry_policy.clone()));
        let backoff = self.options.backoff_policy.clone();
        let client = self.client.clone();
        let options = self.options.clone();
        let session = self.session.clone();
        let inner =
            async move || Self::connect_attempt(client.clone(), session.clone(), &options).await;
        retry_loop(inner, retry, backoff, throttler).await
    }

    pub async fn reconnect(
        &mut self,
        status: tonic::Status,
    ) -> Result<(BidiWriteObjectResponse, OpenHeaders, Connection<T::Stream>)> {
        let error = handle_write_redirect(self.session.clone(), status);
        self.reconnect_attempts += 1;
        let policy = WriteResumeRedirect::new(self.options.write_resume_policy());
        match policy.on_error(&ResumeQuery::new(self.reconnect_attempts), error) {
            ResumeResult::Continue(_) => self.connect().await,
            ResumeResult::Exhausted(e) => Err(e),
            ResumeResult::Permanent(e) => Err(e),
        }
    }

    fn first_message(session: &WriteSessionSpec) -> FirstWriteMessage {
        if session.opened {
            FirstWriteMessage::AppendObjectSpec(AppendObjectSpec {
                bucket: session.bucket.clone(),
                object: session.object.clone(),
                generation: session.generation,
                write_handle: session.write_handle.clone(),
                routing_token: session.routing_token.clone(),
            })
        } else {
            FirstWriteMessage::WriteObjectSpec(WriteObjectSpec {
                resource: Some(Object {
                    bucket: session.bucket.clone(),
                    name: session.object.clone(),
                    ..Object::default()
                }),
                appendable: true,
            })
        }
    }

    async fn connect_attempt(
        client: T,
        session: Arc<Mutex<WriteSessionSpec>>,
        options: &RequestOptions,
    ) -> Result<(BidiWriteObjectResponse, OpenHeaders, Connection<T::Stream>)> {
        let (bucket_name, routing_token, first_message) = {
            let guard = session.lock().expect("never poisoned");
            (
                guard.bucket.clone(),
                guard.routing_token.clone(),
                Self::first_message(&guard),
            )
        };
        if bucket_name
            .strip_prefix("projects/_/buckets/")
            .is_none_or(|x| x.is_empty())
        {
            use crate::error::binding::*;
            let problem = SubstitutionFail::MismatchExpecting(
                bucket_name.to_string(),
                "projects/_/buckets/*",
            );
            let mismatch = SubstitutionMismatch {
                field_name: "bucket",
                problem,
            };
            let mismatch = PathMismatch {
                subs: vec![mismatch],
            };
            let mismatch = BindingError {
                paths: vec![mismatch],
            };

            return Err(crate::Error::binding(mismatch));
        }
        let x_goog_request_params = routing_token
            .iter()
            .fold(format!("bucket={bucket_name}"), |s, token| {
                s + &format!(",routing_token={token}")
            });

        let request = BidiWriteObjectRequest {
            first_message: Some(first_message),
            ..BidiWriteObjectRequest::default()
        };
        let (tx, rx) = tokio::sync::mpsc::channel::<BidiWriteObjectRequest>(100);
        tx.send(request).await.map_err(Error::io)?;

        let extensions = {
            let mut e = tonic::Extensions::new();
            e.insert(tonic::GrpcMethod::new(
                "google.storage.v2.Storage",
                "BidiWriteObject",
            ));
            e
        };
        let path =
            http::uri::PathAndQuery::from_static("/google.storage.v2.Storage/BidiWriteObject");

        let response = client
            .start(
                extensions,
                path,
                rx,
                options,
                &X_GOOG_API_CLIENT_HEADER,
                &x_goog_request_params,
            )
            .await?;
        Self::started(session, tx, response).await
    }

    async fn started(
        session: Arc<Mutex<WriteSessionSpec>>,
        tx: Sender<BidiWriteObjectRequest>,
        response: tonic::Result<tonic::Response<T::Stream>>,
    ) -> Result<(BidiWriteObjectResponse, OpenHeaders, Connection<T::Stream>)> {
        let response = match response {
            Ok(r) => r,
            Err(status) => return Err(handle_write_redirect(session, status)),
        };
        let (metadata, mut stream, _) = response.into_parts();
        let headers = metadata.into_headers();
        match stream.next_message().await {
            Ok(Some(m)) => {
                let mut guard = session.lock().expect("never poisoned");
                guard.opened = true;
                if let Some(resource) = m.resource.as_ref() {
                    guard.generation = resource.generation;
                }
                if m.write_handle.is_some() {
                    guard.write_handle = m.write_handle.clone();
                }
                Ok((m, headers, Connection::new(tx, stream)))
            }
            Ok(None) => Err(Error::io("bidi_write_object stream closed before start")),
            Err(status) => Err(handle_write_redirect(session, status)),
        }
    }
}

/// Dependency injection for [gaxi::grpc::Client], parameterized for writes.
pub trait WriteClient: std::fmt::Debug + Send + 'static {
    type Stream: Sized;
    fn start(
        &self,
        extensions: tonic::Extensions,
        path: http::uri::PathAndQuery,
        rx: Receiver<BidiWriteObjectRequest>,
        options: &RequestOptions,
        api_client_header: &'static str,
        request_params: &str,
    ) -> impl Future<Output = Result<tonic::Result<tonic::Response<Self::Stream>>>> + Send;
}

impl WriteClient for GrpcClient {
    type Stream = tonic::codec::Streaming<BidiWriteObjectResponse>;
    async fn start(
        &self,
        extensions: tonic::Extensions,
        path: http::uri::PathAndQuery,
        rx: Receiver<BidiWriteObjectRequest>,
        options: &RequestOptions,
        api_client_header: &'static str,
        request_params: &str,
    ) -> Result<tonic::Result<tonic::Response<Self::Stream>>> {
        let request = tokio_stream::wrappers::ReceiverStream::new(rx);
        self.bidi_stream_with_status(
            extensions,
            path,
            request,
            options.gax(),
            api_client_header,
            request_params,
        )
        .await
        .map_err(Error::connect)
    }
}

pub trait WriteTonicStreaming: std::fmt::Debug + Send + 'static {
    async fn next_message(&mut self) -> tonic::Result<Option<BidiWriteObjectResponse>>;
}

impl WriteTonicStreaming for tonic::codec::Streaming<BidiWriteObjectResponse> {
    async fn next_message(&mut self) -> tonic::Result<Option<BidiWriteObjectResponse>> {
        self.message().await
    }
}
