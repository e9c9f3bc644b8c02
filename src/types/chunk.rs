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

//! Result chunk metadata and the matrix it is parsed into.

use crate::error::{ChunkErrorHelper, Result};
use crate::types::matrix::{Cell, ResultMatrix};
use serde::Deserialize;

/// Metadata about one result chunk, as listed in the result manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChunkInfo {
    pub chunk_index: i64,
    #[serde(default)]
    pub row_offset: i64,
    pub row_count: i64,
    #[serde(default)]
    pub byte_count: i64,
}

/// A chunk's metadata together with its populated matrix.
#[derive(Debug, Clone)]
pub struct ResultChunk {
    info: ChunkInfo,
    matrix: ResultMatrix,
}

impl ResultChunk {
    /// Create an unparsed chunk with `column_count` columns and no rows.
    ///
    /// Rows are added by the parser. The manifest row count is only checked
    /// by [`verify_row_count`](ResultChunk::verify_row_count), never
    /// allocated up front.
    pub fn new(info: ChunkInfo, column_count: usize) -> Self {
        Self {
            info,
            matrix: ResultMatrix::allocate(0, column_count),
        }
    }

    pub fn info(&self) -> &ChunkInfo {
        &self.info
    }

    pub fn chunk_index(&self) -> i64 {
        self.info.chunk_index
    }

    pub fn matrix(&self) -> &ResultMatrix {
        &self.matrix
    }

    /// Mutable matrix handle to pass to a parser.
    pub fn matrix_mut(&mut self) -> &mut ResultMatrix {
        &mut self.matrix
    }

    pub fn row_count(&self) -> usize {
        self.matrix.row_count()
    }

    pub fn extract_cell(&self, row: usize, col: usize) -> Result<&Cell> {
        self.matrix.get(row, col)
    }

    /// Check the parsed row count against the manifest.
    pub fn verify_row_count(&self) -> Result<()> {
        let parsed = self.matrix.row_count();
        if i64::try_from(parsed).ok() != Some(self.info.row_count) {
            return Err(ChunkErrorHelper::shape_violation().message(format!(
                "Chunk {} has {} rows, manifest expects {}",
                self.info.chunk_index, parsed, self.info.row_count
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn create_test_info(row_count: i64) -> ChunkInfo {
        ChunkInfo {
            chunk_index: 7,
            row_offset: 7000,
            row_count,
            byte_count: 4096,
        }
    }

    #[test]
    fn test_chunk_info_from_manifest_json() {
        let info: ChunkInfo =
            serde_json::from_str(r#"{"chunk_index": 2, "row_count": 500}"#).unwrap();
        assert_eq!(info.chunk_index, 2);
        assert_eq!(info.row_offset, 0);
        assert_eq!(info.row_count, 500);
    }

    #[test]
    fn test_new_chunk_is_unparsed() {
        let chunk = ResultChunk::new(create_test_info(3), 2);
        assert_eq!(chunk.chunk_index(), 7);
        assert_eq!(chunk.info().row_count, 3);
        assert_eq!(chunk.row_count(), 0);
        assert_eq!(chunk.matrix().col_count(), 2);
        assert_eq!(
            chunk.extract_cell(0, 0).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
    }

    #[test]
    fn test_huge_manifest_row_count_allocates_nothing() {
        let chunk = ResultChunk::new(create_test_info(i64::MAX), usize::MAX);
        assert_eq!(chunk.row_count(), 0);
        assert_eq!(
            chunk.verify_row_count().unwrap_err().kind(),
            ErrorKind::ShapeViolation
        );
    }

    #[test]
    fn test_verify_row_count() {
        let mut chunk = ResultChunk::new(create_test_info(1), 1);
        assert!(chunk.verify_row_count().is_err());

        let mut writer = chunk.matrix_mut().writer();
        writer.push_row(vec![Cell::from("a")]).unwrap();
        writer.finish().unwrap();
        assert!(chunk.verify_row_count().is_ok());

        let mut writer = chunk.matrix_mut().writer();
        writer.push_row(vec![Cell::from("a")]).unwrap();
        writer.push_row(vec![Cell::from("b")]).unwrap();
        writer.finish().unwrap();

        let err = chunk.verify_row_count().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeViolation);
    }

    #[test]
    fn test_negative_row_count_allocates_empty() {
        let chunk = ResultChunk::new(create_test_info(-1), 4);
        assert_eq!(chunk.row_count(), 0);
        assert!(chunk.verify_row_count().is_err());
    }
}
