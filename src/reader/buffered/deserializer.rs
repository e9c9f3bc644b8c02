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

//! DeserializerChunkParser: `serde` visitors that write rows as they are parsed.
//!
//! The chunk is buffered, then `serde_json` drives a [`DeserializeSeed`] over
//! it. Each cell is captured as a borrowed [`RawValue`] so numbers keep their
//! literal text, and is pushed into the [`MatrixWriter`] before the next cell
//! is parsed. No intermediate tree is built.

use crate::error::{ChunkErrorHelper, Error, Result};
use crate::reader::buffered::{raw_cell, read_chunk};
use crate::reader::ChunkParser;
use crate::types::config::ChunkParserVersion;
use crate::types::matrix::{MatrixWriter, ResultMatrix};
use async_trait::async_trait;
use serde::de::{self, DeserializeSeed, Deserializer, SeqAccess, Visitor};
use serde_json::value::RawValue;
use std::fmt;
use std::time::Instant;
use tokio::io::AsyncRead;
use tracing::{debug, warn};

/// Parser that deserializes a buffered chunk directly into the matrix.
pub struct DeserializerChunkParser<'a, R: ?Sized> {
    stream: &'a mut R,
}

impl<'a, R> DeserializerChunkParser<'a, R>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    pub fn new(stream: &'a mut R) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<'a, R> ChunkParser for DeserializerChunkParser<'a, R>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    fn version(&self) -> ChunkParserVersion {
        ChunkParserVersion::Deserializer
    }

    async fn parse_chunk(self: Box<Self>, matrix: &mut ResultMatrix) -> Result<()> {
        let start = Instant::now();
        let DeserializerChunkParser { stream } = *self;
        let bytes = read_chunk(stream).await?;

        let mut writer = matrix.writer();
        if let Err(e) = deserialize_rows(&bytes, &mut writer) {
            warn!("Rejecting chunk of {} bytes: {}", bytes.len(), e);
            return Err(e);
        }
        let rows = writer.rows_written();
        writer.finish()?;

        debug!(
            "Deserialized chunk: {} bytes, {} rows x {} cols in {:.2?}",
            bytes.len(),
            rows,
            matrix.col_count(),
            start.elapsed()
        );
        Ok(())
    }
}

/// Parse `bytes` as an array of rows, pushing every row into `writer`.
pub(crate) fn deserialize_rows(bytes: &[u8], writer: &mut MatrixWriter<'_>) -> Result<()> {
    let mut sink = RowSink {
        writer,
        failure: None,
    };
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let parsed = Rows(&mut sink).deserialize(&mut de).and_then(|()| de.end());

    match (parsed, sink.failure) {
        (_, Some(failure)) => Err(failure),
        (Err(e), None) => Err(ChunkErrorHelper::from_json(&e)),
        (Ok(()), None) => Ok(()),
    }
}

/// Writer plus the first crate error raised while visiting.
///
/// `serde` errors only carry a message, so the typed error is kept here and
/// returned in place of the `serde_json` error it caused.
struct RowSink<'w, 'm> {
    writer: &'w mut MatrixWriter<'m>,
    failure: Option<Error>,
}

impl RowSink<'_, '_> {
    fn fail<E: de::Error>(&mut self, err: Error) -> E {
        let de_err = E::custom(err.message());
        self.failure.get_or_insert(err);
        de_err
    }
}

/// Seed for the top-level array.
struct Rows<'s, 'w, 'm>(&'s mut RowSink<'w, 'm>);

impl<'de> DeserializeSeed<'de> for Rows<'_, '_, '_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for Rows<'_, '_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON array of rows")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        let sink = self.0;
        if let Some(hint) = seq.size_hint() {
            sink.writer.reserve_rows(hint);
        }
        while seq.next_element_seed(Row(&mut *sink))?.is_some() {}
        Ok(())
    }
}

/// Seed for one row array.
struct Row<'s, 'w, 'm>(&'s mut RowSink<'w, 'm>);

impl<'de> DeserializeSeed<'de> for Row<'_, '_, '_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for Row<'_, '_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a row array")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        let sink = self.0;
        sink.writer.begin_row().map_err(|e| sink.fail::<A::Error>(e))?;
        while let Some(raw) = seq.next_element::<&'de RawValue>()? {
            let cell = raw_cell(raw).map_err(|e| sink.fail::<A::Error>(e))?;
            sink.writer.push_cell(cell).map_err(|e| sink.fail::<A::Error>(e))?;
        }
        sink.writer.end_row().map_err(|e| sink.fail::<A::Error>(e))
    }
}
