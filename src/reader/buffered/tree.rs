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

//! TreeChunkParser: parse the whole chunk into rows of raw values, then copy.

use crate::error::{ChunkErrorHelper, Result};
use crate::reader::buffered::{raw_cell, read_chunk};
use crate::reader::ChunkParser;
use crate::types::config::ChunkParserVersion;
use crate::types::matrix::{MatrixWriter, ResultMatrix};
use async_trait::async_trait;
use serde_json::value::RawValue;
use std::time::Instant;
use tokio::io::AsyncRead;
use tracing::{debug, warn};

/// Parsed chunk: every row with its cells still in source form.
type ChunkTree<'a> = Vec<Vec<&'a RawValue>>;

/// Parser that builds the full tree of the chunk before copying it.
///
/// Simplest of the strategies, at the cost of holding the raw bytes and the
/// tree in memory together.
pub struct TreeChunkParser<'a, R: ?Sized> {
    stream: &'a mut R,
}

impl<'a, R> TreeChunkParser<'a, R>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    pub fn new(stream: &'a mut R) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<'a, R> ChunkParser for TreeChunkParser<'a, R>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    fn version(&self) -> ChunkParserVersion {
        ChunkParserVersion::Tree
    }

    async fn parse_chunk(self: Box<Self>, matrix: &mut ResultMatrix) -> Result<()> {
        let start = Instant::now();
        let TreeChunkParser { stream } = *self;
        let bytes = read_chunk(stream).await?;

        let mut writer = matrix.writer();
        let copied = build_tree(&bytes).and_then(|tree| copy_rows(&tree, &mut writer));
        if let Err(e) = copied {
            warn!("Rejecting chunk of {} bytes: {}", bytes.len(), e);
            return Err(e);
        }
        let rows = writer.rows_written();
        writer.finish()?;

        debug!(
            "Parsed chunk tree: {} bytes, {} rows x {} cols in {:.2?}",
            bytes.len(),
            rows,
            matrix.col_count(),
            start.elapsed()
        );
        Ok(())
    }
}

fn json_kind(raw: &RawValue) -> &'static str {
    match raw.get().as_bytes().first() {
        Some(b'{') => "object",
        Some(b'[') => "array",
        Some(b'"') => "string",
        Some(b'n') => "null",
        Some(b't') | Some(b'f') => "boolean",
        _ => "number",
    }
}

/// Parse `bytes` into a [`ChunkTree`], checking the array-of-arrays shape.
pub(crate) fn build_tree(bytes: &[u8]) -> Result<ChunkTree<'_>> {
    let top: &RawValue =
        serde_json::from_slice(bytes).map_err(|e| ChunkErrorHelper::from_json(&e))?;
    if !top.get().starts_with('[') {
        return Err(ChunkErrorHelper::malformed_chunk().message(format!(
            "Chunk is a JSON {}, expected an array",
            json_kind(top)
        )));
    }
    let rows: Vec<&RawValue> =
        serde_json::from_str(top.get()).map_err(|e| ChunkErrorHelper::from_json(&e))?;

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            if !row.get().starts_with('[') {
                return Err(ChunkErrorHelper::malformed_chunk().message(format!(
                    "Row {} is a JSON {}, expected an array",
                    index,
                    json_kind(row)
                )));
            }
            serde_json::from_str(row.get()).map_err(|e| ChunkErrorHelper::from_json(&e))
        })
        .collect()
}

/// Copy a parsed chunk tree into `writer`.
pub(crate) fn copy_rows(tree: &ChunkTree<'_>, writer: &mut MatrixWriter<'_>) -> Result<()> {
    writer.reserve_rows(tree.len());
    for row in tree {
        writer.begin_row()?;
        for raw in row {
            writer.push_cell(raw_cell(raw)?)?;
        }
        writer.end_row()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn copy(input: &str, cols: usize) -> Result<ResultMatrix> {
        let mut matrix = ResultMatrix::allocate(0, cols);
        let mut writer = matrix.writer();
        let tree = build_tree(input.as_bytes())?;
        copy_rows(&tree, &mut writer)?;
        writer.finish()?;
        Ok(matrix)
    }

    #[test]
    fn test_copy_scalar_kinds() {
        let matrix = copy(r#"[["a", 7, true, null]]"#, 4).unwrap();
        assert_eq!(matrix.get(0, 0).unwrap().as_text(), Some("a"));
        assert_eq!(matrix.get(0, 1).unwrap().as_text(), Some("7"));
        assert_eq!(matrix.get(0, 2).unwrap().as_text(), Some("true"));
        assert!(matrix.get(0, 3).unwrap().is_null());
    }

    #[test]
    fn test_number_text_is_preserved() {
        let matrix = copy(
            "[[1.50, 1E3, -0, 1e400, 2E-3, 100000000000000000000000000001]]",
            6,
        )
        .unwrap();
        let row: Vec<_> = matrix.row(0).unwrap().iter().map(|c| c.as_text()).collect();
        assert_eq!(
            row,
            vec![
                Some("1.50"),
                Some("1E3"),
                Some("-0"),
                Some("1e400"),
                Some("2E-3"),
                Some("100000000000000000000000000001"),
            ]
        );
    }

    #[test]
    fn test_tree_is_complete_before_copy() {
        let tree = build_tree(br#"[["a"], [], [1, 2]]"#).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree[2].len(), 2);

        // A bad row late in the chunk fails the tree before any copy.
        let err = build_tree(br#"[["1","2","3"], {"a": 1}]"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedChunk);
    }

    #[test]
    fn test_non_array_shapes() {
        for input in [
            r#"{"rows": []}"#,
            r#""text""#,
            "[1, 2]",
            r#"[{"a": 1}]"#,
            "[[[1]]]",
            r#"[[{"a": 1}]]"#,
            "[[1]] [[2]]",
        ] {
            let err = copy(input, 2).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedChunk, "input: {}", input);
        }
    }
}
