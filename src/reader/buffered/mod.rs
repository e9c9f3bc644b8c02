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

//! Chunk parsers that read the whole chunk before parsing it.
//!
//! Both parsers here buffer the stream with [`read_chunk`] and hand the bytes
//! to `serde_json`:
//! - `DeserializerChunkParser`: a `serde` visitor writes rows straight into the matrix
//! - `TreeChunkParser`: parses the whole chunk into rows of raw values, then copies
//!
//! Both capture cells as [`RawValue`]s and convert them with [`raw_cell`], so
//! numbers and literals keep their source text.

pub mod deserializer;
pub mod tree;

use crate::error::{ChunkErrorHelper, Result};
use crate::types::matrix::Cell;
use serde_json::value::RawValue;
use tokio::io::{AsyncRead, AsyncReadExt};

pub use deserializer::DeserializerChunkParser;
pub use tree::TreeChunkParser;

/// Read the remainder of `stream` into memory.
pub(crate) async fn read_chunk<R>(stream: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes).await?;
    Ok(bytes)
}

/// Convert one captured cell into a [`Cell`].
///
/// Strings are unescaped, `null` is absence, nested arrays and objects are
/// rejected, and any other scalar keeps its literal text.
pub(crate) fn raw_cell(raw: &RawValue) -> Result<Cell> {
    let text = raw.get();
    match text.as_bytes().first() {
        Some(b'"') => serde_json::from_str::<String>(text)
            .map(Cell::Value)
            .map_err(|e| ChunkErrorHelper::from_json(&e)),
        Some(b'[') | Some(b'{') => Err(ChunkErrorHelper::malformed_chunk()
            .message(format!("Nested value in cell: {}", text))),
        _ if text == "null" => Ok(Cell::Null),
        _ => Ok(Cell::Value(text.to_string())),
    }
}
