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

//! Model types callers see in errors and responses.
//!
//! These re-export the wire message types directly: the bidi core has no
//! separate "ergonomic" projection of `Object` the way the JSON/HTTP surface
//! does, it is out of scope here.

pub use crate::google::storage::v2::{CommonObjectRequestParams, Object, ObjectChecksums};
