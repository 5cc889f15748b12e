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

//! The CRC32C engine (C8).
//!
//! Hardware acceleration is a hard dependency (`§4.6`/`§4.8`/`§9`): a slow,
//! software CRC32C implementation silently destroys throughput on large
//! transfers, so the client refuses to start a stream rather than fall back
//! quietly. [ensure_hardware_accelerated] is the capability check strategies
//! call once, at stream construction.

use crate::error::Error;

/// Computes the CRC32C of `data`, in the form strategies compare against
/// the wire `crc32c` field.
pub fn crc32c(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// Verify that this process can compute CRC32C with hardware acceleration.
///
/// On `x86`/`x86_64` this means the CPU advertises `sse4.2` (the `crc32`
/// instruction); on `aarch64` it means the `crc` feature. Platforms without
/// either are rejected with a [Error::configuration] error unless the
/// `unstable-software-crc32c` feature is enabled, which is meant only for
/// local development and benchmarking (`§4.8`: "a benchmark mode is a
/// development-only convenience, not part of the core contract").
pub fn ensure_hardware_accelerated() -> Result<(), Error> {
    if cfg!(feature = "unstable-software-crc32c") {
        return Ok(());
    }
    if hardware_available() {
        return Ok(());
    }
    Err(Error::configuration(
        "no hardware-accelerated CRC32C implementation is available on this \
         platform; install a CPU with SSE4.2 (x86_64) or the CRC extension \
         (aarch64), or enable the `unstable-software-crc32c` feature for \
         local development only",
    ))
}

#[cfg(target_arch = "x86_64")]
fn hardware_available() -> bool {
    std::is_x86_feature_detected!("sse4.2")
}

#[cfg(target_arch = "x86")]
fn hardware_available() -> bool {
    std::is_x86_feature_detected!("sse4.2")
}

#[cfg(target_arch = "aarch64")]
fn hardware_available() -> bool {
    std::arch::is_aarch64_feature_detected!("crc")
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "x86", target_arch = "aarch64")))]
fn hardware_available() -> bool {
    false
}
