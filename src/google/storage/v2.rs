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

//! Messages for the `google.storage.v2` bidirectional read and write RPCs.
//!
//! Field numbers follow the public `storage.proto` definitions.

/// A server-issued token pinning a read stream to a specific backend.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BidiReadHandle {
    #[prost(bytes = "bytes", tag = "1")]
    pub handle: ::prost::bytes::Bytes,
}

/// A server-issued token pinning a write stream to a specific backend.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BidiWriteHandle {
    #[prost(bytes = "bytes", tag = "1")]
    pub handle: ::prost::bytes::Bytes,
}

/// Minimal projection of `Object`, enough to carry the fields the bidi core
/// reads off a completed or in-progress resource.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Object {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub bucket: ::prost::alloc::string::String,
    #[prost(int64, tag = "3")]
    pub generation: i64,
    #[prost(int64, tag = "4")]
    pub size: i64,
    #[prost(message, optional, tag = "5")]
    pub finalize_time: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(message, optional, tag = "6")]
    pub checksums: ::core::option::Option<ObjectChecksums>,
    #[prost(int64, tag = "7")]
    pub metageneration: i64,
    #[prost(string, tag = "8")]
    pub storage_class: ::prost::alloc::string::String,
    #[prost(string, tag = "9")]
    pub content_encoding: ::prost::alloc::string::String,
    #[prost(string, tag = "10")]
    pub content_disposition: ::prost::alloc::string::String,
    #[prost(string, tag = "11")]
    pub content_language: ::prost::alloc::string::String,
    #[prost(string, tag = "12")]
    pub content_type: ::prost::alloc::string::String,
    #[prost(string, tag = "13")]
    pub etag: ::prost::alloc::string::String,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name<T: Into<::prost::alloc::string::String>>(mut self, v: T) -> Self {
        self.name = v.into();
        self
    }

    pub fn set_bucket<T: Into<::prost::alloc::string::String>>(mut self, v: T) -> Self {
        self.bucket = v.into();
        self
    }

    pub fn set_generation<T: Into<i64>>(mut self, v: T) -> Self {
        self.generation = v.into();
        self
    }

    pub fn set_size<T: Into<i64>>(mut self, v: T) -> Self {
        self.size = v.into();
        self
    }

    pub fn set_checksums<T: Into<ObjectChecksums>>(mut self, v: T) -> Self {
        self.checksums = Some(v.into());
        self
    }

    pub fn set_metageneration<T: Into<i64>>(mut self, v: T) -> Self {
        self.metageneration = v.into();
        self
    }

    pub fn set_storage_class<T: Into<::prost::alloc::string::String>>(mut self, v: T) -> Self {
        self.storage_class = v.into();
        self
    }

    pub fn set_content_encoding<T: Into<::prost::alloc::string::String>>(mut self, v: T) -> Self {
        self.content_encoding = v.into();
        self
    }

    pub fn set_content_disposition<T: Into<::prost::alloc::string::String>>(
        mut self,
        v: T,
    ) -> Self {
        self.content_disposition = v.into();
        self
    }

    pub fn set_content_language<T: Into<::prost::alloc::string::String>>(mut self, v: T) -> Self {
        self.content_language = v.into();
        self
    }

    pub fn set_content_type<T: Into<::prost::alloc::string::String>>(mut self, v: T) -> Self {
        self.content_type = v.into();
        self
    }

    pub fn set_etag<T: Into<::prost::alloc::string::String>>(mut self, v: T) -> Self {
        self.etag = v.into();
        self
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ObjectChecksums {
    #[prost(uint32, optional, tag = "1")]
    pub crc32c: ::core::option::Option<u32>,
    #[prost(bytes = "bytes", optional, tag = "2")]
    pub md5_hash: ::core::option::Option<::prost::bytes::Bytes>,
}

/// Parameters shared by every request that reads or writes object bytes:
/// a customer-supplied encryption key, if any.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommonObjectRequestParams {
    #[prost(string, tag = "1")]
    pub encryption_algorithm: ::prost::alloc::string::String,
    #[prost(bytes = "bytes", tag = "2")]
    pub encryption_key_bytes: ::prost::bytes::Bytes,
    #[prost(bytes = "bytes", tag = "3")]
    pub encryption_key_sha256_bytes: ::prost::bytes::Bytes,
}

impl CommonObjectRequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_encryption_algorithm<T: Into<::prost::alloc::string::String>>(
        mut self,
        v: T,
    ) -> Self {
        self.encryption_algorithm = v.into();
        self
    }

    pub fn set_encryption_key_bytes<T: Into<::prost::bytes::Bytes>>(mut self, v: T) -> Self {
        self.encryption_key_bytes = v.into();
        self
    }

    pub fn set_encryption_key_sha256_bytes<T: Into<::prost::bytes::Bytes>>(
        mut self,
        v: T,
    ) -> Self {
        self.encryption_key_sha256_bytes = v.into();
        self
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChecksummedData {
    #[prost(bytes = "bytes", tag = "1")]
    pub content: ::prost::bytes::Bytes,
    #[prost(uint32, optional, tag = "2")]
    pub crc32c: ::core::option::Option<u32>,
}

// ---- reads ----

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BidiReadObjectSpec {
    #[prost(string, tag = "1")]
    pub bucket: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub object: ::prost::alloc::string::String,
    #[prost(int64, optional, tag = "3")]
    pub generation: ::core::option::Option<i64>,
    #[prost(message, optional, tag = "4")]
    pub read_handle: ::core::option::Option<BidiReadHandle>,
    #[prost(string, optional, tag = "5")]
    pub routing_token: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(int64, optional, tag = "6")]
    pub if_generation_match: ::core::option::Option<i64>,
    #[prost(int64, optional, tag = "7")]
    pub if_generation_not_match: ::core::option::Option<i64>,
    #[prost(int64, optional, tag = "8")]
    pub if_metageneration_match: ::core::option::Option<i64>,
    #[prost(int64, optional, tag = "9")]
    pub if_metageneration_not_match: ::core::option::Option<i64>,
    #[prost(message, optional, tag = "10")]
    pub common_object_request_params: ::core::option::Option<CommonObjectRequestParams>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadRange {
    #[prost(int64, tag = "1")]
    pub read_offset: i64,
    #[prost(int64, tag = "2")]
    pub read_length: i64,
    #[prost(int64, tag = "3")]
    pub read_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BidiReadObjectRequest {
    #[prost(message, optional, tag = "1")]
    pub read_object_spec: ::core::option::Option<BidiReadObjectSpec>,
    #[prost(message, repeated, tag = "2")]
    pub read_ranges: ::prost::alloc::vec::Vec<ReadRange>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ObjectRangeData {
    #[prost(message, optional, tag = "1")]
    pub read_range: ::core::option::Option<ReadRange>,
    #[prost(message, optional, tag = "2")]
    pub checksummed_data: ::core::option::Option<ChecksummedData>,
    #[prost(bool, tag = "3")]
    pub range_end: bool,
}

/// Metadata attached to the first response of a read stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadMetadata {
    #[prost(int64, tag = "1")]
    pub generation: i64,
    #[prost(int64, tag = "2")]
    pub size: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BidiReadObjectResponse {
    #[prost(message, optional, tag = "1")]
    pub metadata: ::core::option::Option<ReadMetadata>,
    #[prost(message, optional, tag = "2")]
    pub read_handle: ::core::option::Option<BidiReadHandle>,
    #[prost(message, repeated, tag = "3")]
    pub object_data_ranges: ::prost::alloc::vec::Vec<ObjectRangeData>,
}

/// `type.googleapis.com/google.storage.v2.BidiReadObjectRedirectedError`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BidiReadObjectRedirectedError {
    #[prost(string, tag = "1")]
    pub routing_token: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub read_handle: ::core::option::Option<BidiReadHandle>,
}

pub const BIDI_READ_REDIRECT_TYPE_URL: &str =
    "type.googleapis.com/google.storage.v2.BidiReadObjectRedirectedError";

// ---- writes ----

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteObjectSpec {
    #[prost(message, optional, tag = "1")]
    pub resource: ::core::option::Option<Object>,
    #[prost(bool, tag = "2")]
    pub appendable: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AppendObjectSpec {
    #[prost(string, tag = "1")]
    pub bucket: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub object: ::prost::alloc::string::String,
    #[prost(int64, tag = "3")]
    pub generation: i64,
    #[prost(message, optional, tag = "4")]
    pub write_handle: ::core::option::Option<BidiWriteHandle>,
    #[prost(string, optional, tag = "5")]
    pub routing_token: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Oneof)]
pub enum FirstWriteMessage {
    #[prost(message, tag = "1")]
    WriteObjectSpec(WriteObjectSpec),
    #[prost(message, tag = "2")]
    AppendObjectSpec(AppendObjectSpec),
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BidiWriteObjectRequest {
    #[prost(oneof = "FirstWriteMessage", tags = "1, 2")]
    pub first_message: ::core::option::Option<FirstWriteMessage>,
    #[prost(int64, tag = "3")]
    pub write_offset: i64,
    #[prost(message, optional, tag = "4")]
    pub checksummed_data: ::core::option::Option<ChecksummedData>,
    #[prost(bool, tag = "5")]
    pub flush: bool,
    #[prost(bool, tag = "6")]
    pub state_lookup: bool,
    #[prost(bool, tag = "7")]
    pub finish_write: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BidiWriteObjectResponse {
    #[prost(int64, optional, tag = "1")]
    pub persisted_size: ::core::option::Option<i64>,
    #[prost(message, optional, tag = "2")]
    pub write_handle: ::core::option::Option<BidiWriteHandle>,
    #[prost(message, optional, tag = "3")]
    pub resource: ::core::option::Option<Object>,
}

/// `type.googleapis.com/google.storage.v2.BidiWriteObjectRedirectedError`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BidiWriteObjectRedirectedError {
    #[prost(string, tag = "1")]
    pub routing_token: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub write_handle: ::core::option::Option<BidiWriteHandle>,
}

pub const BIDI_WRITE_REDIRECT_TYPE_URL: &str =
    "type.googleapis.com/google.storage.v2.BidiWriteObjectRedirectedError";
