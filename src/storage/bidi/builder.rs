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

use super::connector::Connector;
use super::transport::ObjectDescriptorTransport;
use crate::Result;
use crate::backoff_policy::BackoffPolicy;
use crate::google::storage::v2::BidiReadObjectSpec;
use crate::model_ext::KeyAes256;
use crate::object_descriptor::ObjectDescriptor;
use crate::read_resume_policy::ReadResumePolicy;
use crate::request_options::RequestOptions;
use crate::retry_policy::RetryPolicy;
use crate::retry_throttler::RetryThrottler;
use gaxi::grpc::Client as GrpcClient;

/// A request builder for opening a bidi read stream on an object.
///
/// # Example
/// ```ignore
/// use gcs_bidi_streams::retry_policy::{RetryableErrors, RetryPolicyExt};
/// async fn sample(builder: OpenObject) -> anyhow::Result<()> {
///     use std::time::Duration;
///     let open = builder
///         .set_generation(123)
///         .with_retry_policy(
///             RetryableErrors
///                 .with_attempt_limit(5)
///                 .with_time_limit(Duration::from_secs(90)),
///         )
///         .send()
///         .await?;
///     // Use `open` to read data from the object.
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct OpenObject {
    spec: BidiReadObjectSpec,
    options: RequestOptions,
    client: GrpcClient,
    reconnect_attempts: u32,
}

impl OpenObject {
    /// Creates a new builder for a bidi read of `object` in `bucket`.
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
        let spec = BidiReadObjectSpec {
            bucket,
            object,
            ..BidiReadObjectSpec::default()
        };
        Self {
            spec,
            options,
            client,
            reconnect_attempts: 0_u32,
        }
    }

    /// Sends the request, returning a new object descriptor.
    pub async fn send(self) -> Result<ObjectDescriptor> {
        crate::checksum::ensure_hardware_accelerated()?;
        let connector = Connector::new(self.spec, self.options, self.client);
        let transport = ObjectDescriptorTransport::new(connector).await?;

        Ok(ObjectDescriptor::new(transport))
    }

    /// If present, selects a specific revision of this object (as
    /// opposed to the latest version, the default).
    pub fn set_generation<T: Into<i64>>(mut self, v: T) -> Self {
        self.spec.generation = Some(v.into());
        self
    }

    /// Makes the operation conditional on whether the object's current generation
    /// matches the given value.
    pub fn set_if_generation_match<T>(mut self, v: T) -> Self
    where
        T: Into<i64>,
    {
        self.spec.if_generation_match = Some(v.into());
        self
    }

    /// Makes the operation conditional on whether the object's live generation
    /// does not match the given value. If no live object exists, the precondition
    /// fails.
    pub fn set_if_generation_not_match<T>(mut self, v: T) -> Self
    where
        T: Into<i64>,
    {
        self.spec.if_generation_not_match = Some(v.into());
        self
    }

    /// Makes the operation conditional on whether the object's current
    /// metageneration matches the given value.
    pub fn set_if_metageneration_match<T>(mut self, v: T) -> Self
    where
        T: Into<i64>,
    {
        self.spec.if_metageneration_match = Some(v.into());
        self
    }

    /// Makes the operation conditional on whether the object's current
    /// metageneration does not match the given value.
    pub fn set_if_metageneration_not_match<T>(mut self, v: T) -> Self
    where
        T: Into<i64>,
    {
        self.spec.if_metageneration_not_match = Some(v.into());
        self
    }

    /// The encryption key used with the Customer-Supplied Encryption Keys
    /// feature. In raw bytes format (not base64-encoded).
    pub fn set_key(mut self, v: KeyAes256) -> Self {
        self.spec.common_object_request_params =
            Some(crate::model::CommonObjectRequestParams::from(v));
        self
    }

    /// The retry policy used for the connector's retry loop (`§6`).
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
    ///
    /// Most of the time you want to use the same throttler for all the requests
    /// in a client, and even the same throttler for many clients. Rarely it
    /// may be necessary to use an custom throttler for some subset of the
    /// requests.
    pub fn with_retry_throttler<V: RetryThrottler + 'static>(mut self, v: V) -> Self {
        self.options.retry_throttler = std::sync::Arc::new(std::sync::Mutex::new(v));
        self
    }

    /// Configure the resume policy for read requests.
    ///
    /// The Cloud Storage client library can automatically resume a read that is
    /// interrupted by a transient error. Applications may want to limit the
    /// number of read attempts, or may wish to expand the type of errors
    /// treated as retryable.
    pub fn with_read_resume_policy<V>(mut self, v: V) -> Self
    where
        V: ReadResumePolicy + 'static,
    {
        self.options.set_read_resume_policy(std::sync::Arc::new(v));
        self
    }
}
