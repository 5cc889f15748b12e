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

use super::write_connector::{Connector, WriteSessionSpec};
use super::write_worker::Worker;
use crate::Result;
use crate::backoff_policy::BackoffPolicy;
use crate::model::Object;
use crate::model_ext::KeyAes256;
use crate::request_options::RequestOptions;
use crate::retry_policy::RetryPolicy;
use crate::retry_throttler::RetryThrottler;
use crate::upload_source::{InsertPayload, Seek, StreamingSource, WriteChunker};
use crate::write_resume_policy::WriteResumePolicy;
use gaxi::grpc::Client as GrpcClient;

/// The default number of bytes sent in each outgoing data request (`§6`).
///
/// Matches the target chunk size the buffered (resumable) unary upload path
/// uses elsewhere in this client library.
const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// A request builder that opens a bidi appendable write stream and drives it
/// to completion.
///
/// Unlike [OpenObject][super::OpenObject], which returns a long-lived
/// [ObjectDescriptor][crate::object_descriptor::ObjectDescriptor], this
/// builder's [send][AppendObject::send] consumes an entire source and only
/// returns once the object is durably finalized: there is no partial-result
/// API, because every recoverable failure is already absorbed by the
/// resumption strategy (`§4.7`) before `send()` returns.
///
/// # Example
/// ```ignore
/// async fn sample(builder: AppendObject) -> anyhow::Result<()> {
///     let object = builder.set_chunk_size(256 * 1024).send(b"hello world".as_slice()).await?;
///     println!("object size={}", object.size);
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct AppendObject {
    session: WriteSessionSpec,
    options: RequestOptions,
    client: GrpcClient,
    chunk_size: usize,
    flush_interval: Option<u64>,
}

impl AppendObject {
    /// Creates a new builder for a bidi appendable write of `object` in
    /// `bucket`.
    ///
    /// `client` is a gRPC connection to the Cloud Storage API, e.g. one
    /// built with [gaxi::grpc::Client::new]; applications that already hold
    /// one (for example, from the unary `Storage` client) should reuse it
    /// rather than opening a second connection pool.
    pub fn new(
        bucket: String,
        object: String,
        client: GrpcClient,
        options: RequestOptions,
    ) -> Self {
        let session = WriteSessionSpec {
            bucket,
            object,
            ..WriteSessionSpec::default()
        };
        Self {
            session,
            options,
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
            flush_interval: None,
        }
    }

    /// Sends `source`'s bytes to the service, returning the finalized object
    /// once the service reports a `finalize_time`.
    ///
    /// Transient failures and server-issued redirects are absorbed
    /// transparently, per the write resumption strategy (`§4.7`); this only
    /// returns once the write either finalizes or the resume/retry budget is
    /// exhausted.
    pub async fn send<T, S>(self, source: T) -> Result<Object>
    where
        T: Into<InsertPayload<S>>,
        S: StreamingSource + Seek + Send,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        if self.chunk_size == 0 {
            return Err(crate::Error::configuration(
                "chunk_size must be positive, see AppendObject::set_chunk_size",
            ));
        }
        crate::checksum::ensure_hardware_accelerated()?;
        let payload: InsertPayload<S> = source.into();
        let chunker = WriteChunker::new(payload, self.chunk_size);

        let mut connector = Connector::new(self.session, self.options, self.client);
        let (initial, _headers, connection) = connector.connect().await?;
        let worker = Worker::new(connector);
        worker
            .run(initial, connection, chunker, self.flush_interval)
            .await
    }

    /// The number of bytes sent in each outgoing data request (`§3`,
    /// `chunk_size`). Must be positive; `send()` fails with a
    /// [ConfigurationError][crate::Error::is_configuration] otherwise.
    pub fn set_chunk_size(mut self, v: usize) -> Self {
        self.chunk_size = v;
        self
    }

    /// If set, the client requests a server-side flush (durability
    /// checkpoint) every time the number of bytes sent since the last flush
    /// crosses this threshold (`§3`, `flush_interval`).
    pub fn set_flush_interval(mut self, v: u64) -> Self {
        self.flush_interval = Some(v);
        self
    }

    /// The encryption key used with the Customer-Supplied Encryption Keys
    /// feature. In raw bytes format (not base64-encoded).
    pub fn set_key(mut self, v: KeyAes256) -> Self {
        self.session.common_object_request_params =
            Some(crate::model::CommonObjectRequestParams::from(v));
        self
    }

    /// The retry policy governing the stream-open RPC (`§6`).
    pub fn with_retry_policy<V: RetryPolicy + 'static>(mut self, v: V) -> Self {
        self.options.retry_policy = std::sync::Arc::new(v);
        self
    }

    /// The backoff policy used between retry attempts (`§6`).
    pub fn with_backoff_policy<V: BackoffPolicy + 'static>(mut self, v: V) -> Self {
        self.options.backoff_policy = std::sync::Arc::new(v);
        self
    }

    /// The retry throttler used for this request.
    pub fn with_retry_throttler<V: RetryThrottler + 'static>(mut self, v: V) -> Self {
        self.options.retry_throttler = std::sync::Arc::new(std::sync::Mutex::new(v));
        self
    }

    /// Configure the resume policy for mid-stream write failures.
    ///
    /// The Cloud Storage client library can automatically resume a write
    /// that is interrupted by a transient error or redirect. Applications
    /// may want to limit the number of resume attempts, or may wish to
    /// expand the type of errors treated as resumable.
    pub fn with_write_resume_policy<V>(mut self, v: V) -> Self
    where
        V: WriteResumePolicy + 'static,
    {
        self.options.set_write_resume_policy(std::sync::Arc::new(v));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    async fn test_grpc_client() -> Result<gaxi::grpc::Client> {
        let mut config = gaxi::options::ClientConfig::default();
        config.cred = Some(auth::credentials::anonymous::Builder::new().build());
        let client = gaxi::grpc::Client::new(config, "http://storage.googleapis.com").await?;
        Ok(client)
    }

    #[tokio::test]
    async fn defaults() -> Result<()> {
        let client = test_grpc_client().await?;
        let options = RequestOptions::new();
        let builder = AppendObject::new("bucket".to_string(), "object".to_string(), client, options);
        assert_eq!(builder.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(builder.flush_interval, None);
        assert_eq!(builder.session.bucket, "bucket");
        assert_eq!(builder.session.object, "object");
        assert!(!builder.session.opened);
        Ok(())
    }

    #[tokio::test]
    async fn attributes() -> Result<()> {
        let client = test_grpc_client().await?;
        let options = RequestOptions::new();
        let builder = AppendObject::new("bucket".to_string(), "object".to_string(), client, options)
            .set_chunk_size(1234)
            .set_flush_interval(5678);
        assert_eq!(builder.chunk_size, 1234);
        assert_eq!(builder.flush_interval, Some(5678));
        Ok(())
    }

    #[tokio::test]
    async fn csek() -> Result<()> {
        use crate::google::storage::v2::CommonObjectRequestParams;
        use crate::model_ext::tests::create_key_helper;

        let client = test_grpc_client().await?;
        let options = RequestOptions::new();
        let builder = AppendObject::new("bucket".to_string(), "object".to_string(), client, options);

        let (key, _, key_sha256, _) = create_key_helper();
        let builder = builder.set_key(KeyAes256::new(&key)?);
        let want = CommonObjectRequestParams {
            encryption_algorithm: "AES256".into(),
            encryption_key_bytes: bytes::Bytes::from_owner(key),
            encryption_key_sha256_bytes: bytes::Bytes::from_owner(key_sha256),
        };
        assert_eq!(builder.session.common_object_request_params, Some(want));
        Ok(())
    }

    #[tokio::test]
    async fn request_options() -> Result<()> {
        use crate::backoff_policy::ExponentialBackoffBuilder;
        use crate::retry_policy::RetryableErrors;
        use crate::retry_throttler::CircuitBreaker;
        use crate::write_resume_policy::NeverResume;

        let client = test_grpc_client().await?;
        let options = RequestOptions::new();
        let builder = AppendObject::new(
            "bucket".to_string(),
            "object".to_string(),
            client,
            options.clone(),
        )
        .with_backoff_policy(
            ExponentialBackoffBuilder::default()
                .with_scaling(4.0)
                .build()
                .expect("expontial backoff builds"),
        )
        .with_retry_policy(RetryableErrors)
        .with_retry_throttler(CircuitBreaker::default())
        .with_write_resume_policy(NeverResume);

        let got = builder.options;
        assert!(
            format!("{:?}", got.backoff_policy).contains("ExponentialBackoff"),
            "{got:?}"
        );
        assert!(
            format!("{:?}", got.retry_policy).contains("RetryableErrors"),
            "{got:?}"
        );
        assert!(
            format!("{:?}", got.retry_throttler.lock().expect("not poisoned")).contains("CircuitBreaker"),
            "{got:?}"
        );
        assert!(
            format!("{:?}", got.write_resume_policy()).contains("NeverResume"),
            "{got:?}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn zero_chunk_size_is_a_configuration_error() -> Result<()> {
        let client = test_grpc_client().await?;
        let options = RequestOptions::new();
        let builder = AppendObject::new("bucket".to_string(), "object".to_string(), client, options)
            .set_chunk_size(0);
        let err = builder.send(b"hello".as_slice()).await.unwrap_err();
        assert!(err.is_configuration(), "{err:?}");
        Ok(())
    }
}
