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

//! Error types for the bidi streaming core.
//!
//! The top-level [Error] type wraps a transport error (a [tonic::Status]), an
//! I/O-level failure, or a detailed [ReadError]/[WriteError] produced by the
//! resumption strategies. Use [Error::source] and `downcast_ref` to recover
//! the detailed cause, the same pattern the rest of this client library uses.

use crate::model::{Object, ObjectChecksums};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Indicates that a checksum mismatch was detected while reading or writing
/// a Cloud Storage object.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum ChecksumMismatch {
    /// The CRC32C checksum sent by the service does not match the computed
    /// (or expected) value.
    Crc32c { got: u32, want: u32 },

    /// The MD5 hash sent by the service does not match the computed (or
    /// expected) value.
    Md5 {
        got: bytes::Bytes,
        want: bytes::Bytes,
    },

    /// Both the CRC32C checksum and the MD5 hash sent by the service do not
    /// match the computed (or expected) values.
    Both {
        got: Box<ObjectChecksums>,
        want: Box<ObjectChecksums>,
    },
}

impl fmt::Display for ChecksumMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crc32c { got, want } => write!(
                f,
                "the CRC32C checksums do not match: got=0x{got:08x}, want=0x{want:08x}"
            ),
            Self::Md5 { got, want } => write!(
                f,
                "the MD5 hashes do not match: got={got:0x?}, want={want:0x?}"
            ),
            Self::Both { got, want } => write!(
                f,
                "both the CRC32C checksums and MD5 hashes do not match: got.crc32c=0x{:08x}, want.crc32c=0x{:08x}",
                got.crc32c.unwrap_or_default(),
                want.crc32c.unwrap_or_default(),
            ),
        }
    }
}

/// Errors detected while consuming a bidi read stream.
///
/// These are integrity invariant violations (see `§4.6`/`§4.8` of the
/// design): they are never retried, the whole call aborts.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ReadError {
    /// A range's starting offset, as reported by the service, is negative.
    #[error("bad offset {0} in bidi read response")]
    BadOffsetInBidiResponse(i64),

    /// A range's length, as reported by the service, is negative.
    #[error("bad length {0} in bidi read response")]
    BadLengthInBidiResponse(i64),

    /// A chunk's `read_offset` did not equal the range's `next_expected_offset`.
    #[error("out of order bidi read response: got offset {got}, expected {expected}")]
    OutOfOrderBidiResponse { got: i64, expected: i64 },

    /// The service sent more bytes for a range than the range has left.
    #[error("long read: got {got} bytes, expected at most {expected}")]
    LongRead { got: u64, expected: u64 },

    /// The stream closed before a range with a known, non-zero remaining
    /// length was completed.
    #[error("short read: missing {0} bytes at the end of the stream")]
    ShortRead(u64),

    /// The calculated checksum did not match the server-provided checksum.
    #[error("{0}")]
    ChecksumMismatch(ChecksumMismatch),

    /// The service sent a bidi read response this client cannot reconcile
    /// with the range it requested, e.g. the first response for a range
    /// referenced an offset the client never asked for.
    #[error("invalid bidi streaming read response: {0}")]
    InvalidBidiStreamingReadResponse(String),

    /// A range was interrupted by an unrecoverable error, e.g. the resume
    /// policy gave up, or the error is not retriable.
    #[error("bidi read interrupted: {0}")]
    UnrecoverableBidiReadInterrupt(Arc<crate::Error>),

    /// A bidi read response did not include a `read_range`.
    #[error("bidi read response is missing a read_range")]
    MissingRangeInBidiResponse,

    /// A response referenced a `read_id` this call never requested.
    #[error("response referenced unknown bidi range id {0}")]
    UnknownBidiRangeId(i64),
}

impl ReadError {
    /// Builds the [InvalidBidiStreamingReadResponse][ReadError::InvalidBidiStreamingReadResponse]
    /// variant for a range whose first response does not start at the
    /// requested offset.
    pub(crate) fn bidi_out_of_order(expected: i64, got: i64) -> Self {
        Self::InvalidBidiStreamingReadResponse(format!(
            "expected the first response for this range to start at offset {expected}, got {got}"
        ))
    }
}

/// Errors detected while driving a bidi appendable write stream.
///
/// Mirrors [ReadError]'s role for `§4.7`/`§4.8` of the design.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum WriteError {
    /// The service previously reported more bytes as persisted than it now
    /// reports. This is always a bug: either in the service, in this client,
    /// or in the transport. The client cannot localize the bug, so the
    /// problem is reported rather than silently worked around.
    #[error(
        "the service previously persisted {offset} bytes, but now reports only {persisted} as persisted"
    )]
    UnexpectedRewind { offset: u64, persisted: u64 },

    /// The service reports more bytes persisted than the client ever sent.
    /// Usually indicates two concurrent uploads sharing one session.
    #[error("the service reports {persisted} bytes as persisted, but only {sent} bytes were sent")]
    TooMuchProgress { sent: u64, persisted: u64 },

    /// The checksums reported by the service at finalize time do not match
    /// what the client computed while sending data.
    #[error("checksum mismatch {mismatch} when uploading {} to {}", object.name, object.bucket)]
    ChecksumMismatch {
        mismatch: ChecksumMismatch,
        object: Box<Object>,
    },

    /// `recover_state_on_failure` tried to seek the write source back to
    /// `persisted_size` and the source rejected the seek (e.g. it is not
    /// actually rewindable).
    #[error("failed to seek write source back to offset {offset}")]
    SeekFailed {
        offset: u64,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// Indicates a [crate::model_ext::KeyAes256] could not be constructed.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeyAes256Error {
    /// The supplied key was not exactly 32 bytes long.
    #[error("a KeyAes256 must be exactly 32 bytes long")]
    InvalidLength,
}

/// A routing token and/or rotated handle recovered from a redirect error,
/// regardless of which of the three shapes (direct error, wrapped error, or
/// `grpc-status-details-bin` trailer) it arrived in.
///
/// See `§9` ("Status-details parsing") of the design: this is the single
/// extraction result type both the read and write strategies consume.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RedirectInfo {
    pub routing_token: Option<String>,
    pub read_handle: Option<bytes::Bytes>,
    pub write_handle: Option<bytes::Bytes>,
}

/// The top-level error type returned by the bidi streaming core.
#[derive(Debug)]
pub struct Error(Box<ErrorImpl>);

#[derive(Debug)]
struct ErrorImpl {
    kind: ErrorKind,
}

#[derive(Debug)]
enum ErrorKind {
    /// An error surfaced directly by the transport (gRPC status), including
    /// ones the redirect machinery re-interprets as a state transition.
    Rpc(tonic::Status),
    /// A lower-level I/O or channel failure, e.g. a dropped `mpsc` receiver.
    /// Carries whatever concrete error caused it so callers can downcast.
    Io(Box<dyn StdError + Send + Sync>),
    /// A response could not be deserialized or was missing required fields.
    Deserialization(String),
    /// A generic transport-level failure that is not itself a gRPC status,
    /// e.g. a connection that could never be established.
    Transport(String),
    /// The underlying transport channel could not be established, e.g. the
    /// endpoint could not be resolved or TLS negotiation failed.
    Connect(Box<dyn StdError + Send + Sync>),
    /// An operation exceeded a client-side deadline.
    Timeout(String),
    /// An integrity violation found while consuming a read stream.
    Read(ReadError),
    /// An integrity violation, or unrecoverable progress bug, found while
    /// driving a write stream.
    Write(WriteError),
    /// Caller misuse, e.g. more than 1000 ranges in one multi-range call.
    InvalidArgument(String),
    /// A required capability is missing or misconfigured, e.g. no
    /// hardware-accelerated CRC32C implementation is available.
    Configuration(String),
    /// The retry budget was exhausted, or `recover_state_on_failure` itself
    /// failed. Carries the last cause.
    RetryError(Box<Error>),
    /// The request could not be bound to any of the URIs the RPC supports,
    /// e.g. the bucket name did not match the expected `projects/_/buckets/*`
    /// form.
    Binding(binding::BindingError),
}

impl Error {
    pub fn rpc(status: tonic::Status) -> Self {
        Self(Box::new(ErrorImpl {
            kind: ErrorKind::Rpc(status),
        }))
    }

    /// Wraps a lower-level I/O or channel error, e.g. a failed channel send
    /// or receive while shuttling bytes between the worker and its readers.
    pub fn io(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(Box::new(ErrorImpl {
            kind: ErrorKind::Io(source.into()),
        }))
    }

    pub fn deser(msg: impl Into<String>) -> Self {
        Self(Box::new(ErrorImpl {
            kind: ErrorKind::Deserialization(msg.into()),
        }))
    }

    pub fn transport(_headers: impl Into<HeaderHint>, msg: impl Into<String>) -> Self {
        Self(Box::new(ErrorImpl {
            kind: ErrorKind::Transport(msg.into()),
        }))
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self(Box::new(ErrorImpl {
            kind: ErrorKind::Timeout(msg.into()),
        }))
    }

    pub fn read(err: ReadError) -> Self {
        Self(Box::new(ErrorImpl {
            kind: ErrorKind::Read(err),
        }))
    }

    pub fn write(err: WriteError) -> Self {
        Self(Box::new(ErrorImpl {
            kind: ErrorKind::Write(err),
        }))
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self(Box::new(ErrorImpl {
            kind: ErrorKind::InvalidArgument(msg.into()),
        }))
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self(Box::new(ErrorImpl {
            kind: ErrorKind::Configuration(msg.into()),
        }))
    }

    pub fn retry_exhausted(cause: Error) -> Self {
        Self(Box::new(ErrorImpl {
            kind: ErrorKind::RetryError(Box::new(cause)),
        }))
    }

    /// Wraps a failure to establish the underlying transport channel, e.g.
    /// the endpoint could not be resolved or TLS negotiation failed.
    pub fn connect(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(Box::new(ErrorImpl {
            kind: ErrorKind::Connect(source.into()),
        }))
    }

    /// Wraps a failure to bind a request to any of the URIs an RPC supports.
    pub fn binding(err: binding::BindingError) -> Self {
        Self(Box::new(ErrorImpl {
            kind: ErrorKind::Binding(err),
        }))
    }

    /// The gRPC status carried by this error, if it is (or wraps) one.
    pub fn status(&self) -> Option<&tonic::Status> {
        match &self.0.kind {
            ErrorKind::Rpc(s) => Some(s),
            ErrorKind::RetryError(cause) => cause.status(),
            _ => None,
        }
    }

    pub fn is_data_corruption(&self) -> bool {
        matches!(self.0.kind, ErrorKind::Read(_) | ErrorKind::Write(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.0.kind, ErrorKind::InvalidArgument(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self.0.kind, ErrorKind::Configuration(_))
    }

    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self.0.kind, ErrorKind::RetryError(_))
    }

    /// True for [Error::io], i.e. a failure shuttling bytes through an
    /// internal channel rather than a gRPC status.
    pub fn is_io(&self) -> bool {
        matches!(self.0.kind, ErrorKind::Io(_))
    }

    /// True for any transport-level failure: an RPC status, an I/O failure,
    /// or a generic transport error. Resume and retry policies treat all
    /// three the same way.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.0.kind,
            ErrorKind::Rpc(_) | ErrorKind::Io(_) | ErrorKind::Transport(_)
        )
    }

    pub fn is_deserialization(&self) -> bool {
        matches!(self.0.kind, ErrorKind::Deserialization(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.0.kind, ErrorKind::Timeout(_))
    }

    /// True for [Error::connect]: the transport channel itself could not be
    /// established, as opposed to an RPC failing over an established one.
    pub fn is_connect(&self) -> bool {
        matches!(self.0.kind, ErrorKind::Connect(_))
    }

    /// True for [Error::binding]: the request could not be matched to any of
    /// the URIs the RPC supports.
    pub fn is_binding(&self) -> bool {
        matches!(self.0.kind, ErrorKind::Binding(_))
    }
}

/// A placeholder for header context passed to [Error::transport]; the bidi
/// core does not currently use the headers, but keeps the constructor shape
/// consistent with the rest of this client library's transport errors.
#[derive(Debug, Default)]
pub struct HeaderHint;

impl From<http::HeaderMap> for HeaderHint {
    fn from(_value: http::HeaderMap) -> Self {
        Self
    }
}

impl From<&str> for HeaderHint {
    fn from(_value: &str) -> Self {
        Self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            ErrorKind::Rpc(s) => write!(f, "rpc error: {s}"),
            ErrorKind::Io(e) => write!(f, "i/o error: {e}"),
            ErrorKind::Deserialization(m) => write!(f, "deserialization error: {m}"),
            ErrorKind::Transport(m) => write!(f, "transport error: {m}"),
            ErrorKind::Timeout(m) => write!(f, "timeout: {m}"),
            ErrorKind::Read(e) => write!(f, "read error: {e}"),
            ErrorKind::Write(e) => write!(f, "write error: {e}"),
            ErrorKind::InvalidArgument(m) => write!(f, "invalid argument: {m}"),
            ErrorKind::Configuration(m) => write!(f, "configuration error: {m}"),
            ErrorKind::RetryError(cause) => write!(f, "retry budget exhausted: {cause}"),
            ErrorKind::Connect(e) => write!(f, "connect error: {e}"),
            ErrorKind::Binding(e) => write!(f, "binding error: {e}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.0.kind {
            ErrorKind::Rpc(s) => Some(s),
            ErrorKind::Io(e) => Some(e.as_ref()),
            ErrorKind::Deserialization(_) => None,
            ErrorKind::Transport(_) => None,
            ErrorKind::Timeout(_) => None,
            ErrorKind::Read(e) => Some(e),
            ErrorKind::Write(e) => Some(e),
            ErrorKind::InvalidArgument(_) => None,
            ErrorKind::Configuration(_) => None,
            ErrorKind::RetryError(cause) => Some(cause.as_ref()),
            ErrorKind::Connect(e) => Some(e.as_ref()),
            ErrorKind::Binding(e) => Some(e),
        }
    }
}

/// A failure to determine the request URI, e.g. a field did not match the
/// expected `projects/_/buckets/*`-style pattern required to route the RPC.
pub mod binding {
    /// A failure to bind a request to any of the URIs an RPC supports.
    #[derive(thiserror::Error, Debug, PartialEq)]
    pub struct BindingError {
        /// All the paths considered, and why binding failed for each.
        pub paths: Vec<PathMismatch>,
    }

    /// A failure to bind to one specific path.
    #[derive(Debug, Default, PartialEq)]
    pub struct PathMismatch {
        pub subs: Vec<SubstitutionMismatch>,
    }

    /// Ways substituting a field into a path can fail.
    #[derive(Debug, PartialEq)]
    pub enum SubstitutionFail {
        Unset,
        UnsetExpecting(&'static str),
        MismatchExpecting(String, &'static str),
    }

    /// A failure to substitute one field into a path.
    #[derive(Debug, PartialEq)]
    pub struct SubstitutionMismatch {
        pub field_name: &'static str,
        pub problem: SubstitutionFail,
    }

    impl std::fmt::Display for SubstitutionMismatch {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match &self.problem {
                SubstitutionFail::Unset => write!(f, "field `{}` needs to be set.", self.field_name),
                SubstitutionFail::UnsetExpecting(expected) => write!(
                    f,
                    "field `{}` needs to be set and match: '{}'",
                    self.field_name, expected
                ),
                SubstitutionFail::MismatchExpecting(actual, expected) => write!(
                    f,
                    "field `{}` should match: '{}'; found: '{}'",
                    self.field_name, expected, actual
                ),
            }
        }
    }

    impl std::fmt::Display for PathMismatch {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            for (i, sub) in self.subs.iter().enumerate() {
                if i != 0 {
                    write!(f, " AND ")?;
                }
                write!(f, "{sub}")?;
            }
            Ok(())
        }
    }

    impl std::fmt::Display for BindingError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "at least one of the conditions must be met: ")?;
            for (i, sub) in self.paths.iter().enumerate() {
                if i != 0 {
                    write!(f, " OR ")?;
                }
                write!(f, "{sub}")?;
            }
            Ok(())
        }
    }
}

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        Self::rpc(status)
    }
}

/// A wrapper to let an already-terminal [Error] be cloned and handed to
/// several pending consumers at once.
pub type SharedError = Arc<Error>;
