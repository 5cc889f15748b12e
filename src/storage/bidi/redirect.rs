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

use crate::Error;
use crate::google::rpc::Status as RpcStatus;
use crate::google::storage::v2::{BidiReadObjectRedirectedError, BidiReadObjectSpec};
use prost::Message;
use std::error::Error as _;
use std::sync::{Arc, Mutex};

/// Absorbs a redirect: a server-issued `ABORTED` status carrying a rotated
/// routing token and/or read handle, updating the shared spec in place so the
/// next reconnect attempt uses it.
pub fn handle_redirect(spec: Arc<Mutex<BidiReadObjectSpec>>, status: tonic::Status) -> Error {
    if let Ok(details) = RpcStatus::decode(status.details()) {
        for d in details.details {
            if let Ok(redirect) = d.to_msg::<BidiReadObjectRedirectedError>() {
                let mut guard = spec.lock().expect("never poisoned");
                guard.routing_token = (!redirect.routing_token.is_empty())
                    .then_some(redirect.routing_token);
                guard.read_handle = redirect.read_handle;
                break;
            }
        }
    }
    Error::rpc(status)
}

/// Determine if an error is a redirect error.
pub fn is_redirect(error: &Error) -> bool {
    if error.status().is_none_or(|s| s.code() != tonic::Code::Aborted) {
        return false;
    }
    let Some(status) = as_inner::<tonic::Status, Error>(error) else {
        return false;
    };

    let Ok(details) = RpcStatus::decode(status.details()) else {
        return false;
    };
    details
        .details
        .iter()
        .any(|d| d.to_msg::<BidiReadObjectRedirectedError>().is_ok())
}

fn as_inner<T, E>(error: &E) -> Option<&T>
where
    T: std::error::Error + 'static,
    E: std::error::Error,
{
    let mut e = error.source()?;
    // Prevent infinite loops due to cycles in the `source()` errors. This seems
    // unlikely, and it would require effort to create, but it is easy to
    // prevent.
    for _ in 0..32 {
        if let Some(value) = e.downcast_ref::<T>() {
            return Some(value);
        }
        e = e.source()?;
    }
    None
}
