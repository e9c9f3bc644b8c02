// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for chunk parsing.
//!
//! Errors are constructed through [`ChunkErrorHelper`], which picks the
//! [`ErrorKind`] and then attaches a message:
//!
//! ```ignore
//! return Err(ChunkErrorHelper::malformed_chunk().message("row 3 is not an array"));
//! ```

use std::fmt;

/// Classification of a chunk-parsing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input violates the array-of-arrays shape or is not valid JSON.
    MalformedChunk,
    /// A row is wider than the matrix's declared column count.
    ShapeViolation,
    /// A cell was addressed outside the matrix bounds.
    OutOfRange,
    /// Unknown parser version or an invalid option value.
    Configuration,
    /// Reading the chunk stream failed.
    Io,
    /// The parse was cancelled before it completed.
    Cancelled,
    /// An operation was attempted in a state that does not allow it.
    InvalidState,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MalformedChunk => "malformed chunk",
            ErrorKind::ShapeViolation => "shape violation",
            ErrorKind::OutOfRange => "out of range",
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Io => "I/O error",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidState => "invalid state",
        };
        f.write_str(name)
    }
}

/// Error returned by every fallible operation in this crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Builder returned by the [`ChunkErrorHelper`] constructors.
#[derive(Debug, Clone, Copy)]
pub struct ErrorBuilder {
    kind: ErrorKind,
}

impl ErrorBuilder {
    /// Finish the error with a human-readable message.
    pub fn message(self, message: impl Into<String>) -> Error {
        Error::new(self.kind, message)
    }
}

/// Entry point for constructing [`Error`] values by kind.
pub struct ChunkErrorHelper;

impl ChunkErrorHelper {
    pub fn malformed_chunk() -> ErrorBuilder {
        ErrorBuilder {
            kind: ErrorKind::MalformedChunk,
        }
    }

    pub fn shape_violation() -> ErrorBuilder {
        ErrorBuilder {
            kind: ErrorKind::ShapeViolation,
        }
    }

    pub fn out_of_range() -> ErrorBuilder {
        ErrorBuilder {
            kind: ErrorKind::OutOfRange,
        }
    }

    pub fn configuration() -> ErrorBuilder {
        ErrorBuilder {
            kind: ErrorKind::Configuration,
        }
    }

    pub fn io() -> ErrorBuilder {
        ErrorBuilder {
            kind: ErrorKind::Io,
        }
    }

    pub fn cancelled() -> ErrorBuilder {
        ErrorBuilder {
            kind: ErrorKind::Cancelled,
        }
    }

    pub fn invalid_state() -> ErrorBuilder {
        ErrorBuilder {
            kind: ErrorKind::InvalidState,
        }
    }

    /// Map a `serde_json` failure onto the malformed-chunk kind.
    pub fn from_json(err: &serde_json::Error) -> Error {
        if err.is_io() {
            return Self::io().message(format!("Failed to read chunk: {}", err));
        }
        Self::malformed_chunk().message(format!("Invalid chunk JSON: {}", err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        ChunkErrorHelper::io().message(format!("Failed to read chunk stream: {}", err))
    }
}
