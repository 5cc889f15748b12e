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

use crate::{google::storage::v2::BidiReadObjectSpec, model::CommonObjectRequestParams};

/// The request type for a bidi read object streaming RPC.
///
/// This type represents a request for
/// [OpenObject][crate::storage::bidi::OpenObject]. Applications rarely use
/// this type directly, but it might be used in tests where the client
/// library is being mocked.
// Implementation note: this type exclude some fields from the proto, such as
// the read handle and routing token, as these cannot be set by the application.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct OpenObjectRequest {
    /// The bucket containing the target object.
    pub bucket: String,
    /// The target object name.
    pub object: String,
    /// The target object generation. If zero, then target the latest version of the object.
    pub generation: i64,
    /// If set, return an error if the current generation does not match the value.
    pub if_generation_match: Option<i64>,
    /// If set, return an error if the current generation matches the value.
    pub if_generation_not_match: Option<i64>,
    /// If set, return an error if the current metageneration does not match the value.
    pub if_metageneration_match: Option<i64>,
    /// If set, return an error if the current metageneration matches the value.
    pub if_metageneration_not_match: Option<i64>,
    /// Parameters that can be passed to any object request.
    ///
    /// At the moment, these are only encryption parameters for
    /// [Customer-Supplied Encryption Keys].
    ///
    /// [Customer-Supplied Encryption Keys]: https://docs.cloud.google.com/storage/docs/encryption/customer-supplied-keys
    pub common_object_request_params: Option<CommonObjectRequestParams>,
}

impl OpenObjectRequest {
    /// Sets the [bucket][OpenObjectRequest::bucket] field.
    pub fn set_bucket<T>(mut self, v: T) -> Self
    where
        T: Into<String>,
    {
        self.bucket = v.into();
        self
    }

    /// Sets the [object][OpenObjectRequest::object] field.
    pub fn set_object<T>(mut self, v: T) -> Self
    where
        T: Into<String>,
    {
        self.object = v.into();
        self
    }

    /// Sets the [generation][OpenObjectRequest::generation] field.
    pub fn set_generation(mut self, v: i64) -> Self {
        self.generation = v;
        self
    }

    /// Sets the [if_generation_match][OpenObjectRequest::if_generation_match] field.
    pub fn set_if_generation_match(mut self, v: i64) -> Self {
        self.if_generation_match = Some(v);
        self
    }

    /// Sets the [if_generation_match][OpenObjectRequest::if_generation_match] field.
    pub fn set_or_clear_if_generation_match(mut self, v: Option<i64>) -> Self {
        self.if_generation_match = v;
        self
    }

    /// Sets the [if_generation_not_match][OpenObjectRequest::if_generation_not_match] field.
    pub fn set_if_generation_not_match(mut self, v: i64) -> Self {
        self.if_generation_not_match = Some(v);
        self
    }

    /// Sets the [if_generation_not_match][OpenObjectRequest::if_generation_not_match] field.
    pub fn set_or_clear_if_generation_not_match(mut self, v: Option<i64>) -> Self {
        self.if_generation_not_match = v;
        self
    }

    /// Sets the [if_metageneration_match][OpenObjectRequest::if_metageneration_match] field.
    pub fn set_if_metageneration_match(mut self, v: i64) -> Self {
        self.if_metageneration_match = Some(v);
        self
    }

    /// Sets the [if_metageneration_match][OpenObjectRequest::if_metageneration_match] field.
    pub fn set_or_clear_if_metageneration_match(mut self, v: Option<i64>) -> Self {
        self.if_metageneration_match = v;
        self
    }

    /// Sets the [if_metageneration_not_match][OpenObjectRequest::if_metageneration_not_match] field.
    pub fn set_if_metageneration_not_match(mut self, v: i64) -> Self {
        self.if_metageneration_not_match = Some(v);
        self
    }

    /// Sets the [if_metageneration_not_match][OpenObjectRequest::if_metageneration_not_match] field.
    pub fn set_or_clear_if_metageneration_not_match(mut self, v: Option<i64>) -> Self {
        self.if_metageneration_not_match = v;
        self
    }

    /// Sets the [common_object_request_params][OpenObjectRequest::common_object_request_params] field.
    pub fn set_common_object_request_params(mut self, v: CommonObjectRequestParams) -> Self {
        self.common_object_request_params = Some(v);
        self
    }

    /// Sets the [common_object_request_params][OpenObjectRequest::common_object_request_params] field.
    pub fn set_or_clear_common_object_request_params(
        mut self,
        v: Option<CommonObjectRequestParams>,
    ) -> Self {
        self.common_object_request_params = v;
        self
    }
}

impl From<OpenObjectRequest> for BidiReadObjectSpec {
    fn from(value: OpenObjectRequest) -> Self {
        Self {
            bucket: value.bucket,
            object: value.object,
            generation: (value.generation != 0).then_some(value.generation),
            if_generation_match: value.if_generation_match,
            if_generation_not_match: value.if_generation_not_match,
            if_metageneration_match: value.if_metageneration_match,
            if_metageneration_not_match: value.if_metageneration_not_match,
            common_object_request_params: value.common_object_request_params,
            ..BidiReadObjectSpec::default()
        }
    }
}
