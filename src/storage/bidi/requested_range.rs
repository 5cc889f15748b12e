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

use crate::error::ReadError;
use crate::google::storage::v2::ReadRange as ProtoRange;
use crate::model_ext::RequestedRange;

type ReadResult<T> = std::result::Result<T, ReadError>;

/// Additional functions to use `RequestedRange` in pending requests.
///
/// [ActiveRead][super::active_read::ActiveRead] is initialized with the
/// requested ranges. While these are normalized when the first response
/// arrives, they must be usable to resume connections.
impl RequestedRange {
    pub fn as_proto(&self, id: i64) -> ProtoRange {
        match self {
            Self::Offset(o) => ProtoRange {
                read_id: id,
                read_offset: *o as i64,
                ..ProtoRange::default()
            },
            Self::Tail(o) => ProtoRange {
                read_id: id,
                read_offset: -(*o as i64),
                ..ProtoRange::default()
            },
            Self::Segment { offset, limit } => ProtoRange {
                read_id: id,
                read_offset: *offset as i64,
                read_length: *limit as i64,
            },
        }
    }
}
