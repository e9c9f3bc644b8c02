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

//! StreamingChunkParser for tokenizing chunks as bytes arrive.

use crate::error::Result;
use crate::reader::streaming::tokenizer::RowTokenizer;
use crate::reader::ChunkParser;
use crate::types::config::ChunkParserVersion;
use crate::types::matrix::ResultMatrix;
use async_trait::async_trait;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

/// Parser that tokenizes the chunk incrementally.
///
/// Each read fills a buffer of `read_buffer_size` bytes which is handed to
/// the tokenizer before the next read, so memory use does not grow with the
/// chunk size beyond the rows themselves. The stream is borrowed and is left
/// open when parsing finishes.
pub struct StreamingChunkParser<'a, R: ?Sized> {
    stream: &'a mut R,
    read_buffer_size: usize,
}

impl<'a, R> StreamingChunkParser<'a, R>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    /// Create a parser bound to `stream`.
    ///
    /// A `read_buffer_size` of zero is raised to one byte.
    pub fn new(stream: &'a mut R, read_buffer_size: usize) -> Self {
        Self {
            stream,
            read_buffer_size: read_buffer_size.max(1),
        }
    }
}

#[async_trait]
impl<'a, R> ChunkParser for StreamingChunkParser<'a, R>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    fn version(&self) -> ChunkParserVersion {
        ChunkParserVersion::Streaming
    }

    async fn parse_chunk(self: Box<Self>, matrix: &mut ResultMatrix) -> Result<()> {
        let start = Instant::now();
        let StreamingChunkParser {
            stream,
            read_buffer_size,
        } = *self;
        let mut buf = vec![0u8; read_buffer_size];
        let mut tokenizer = RowTokenizer::new();
        let mut writer = matrix.writer();
        let mut total_bytes = 0usize;

        loop {
            let n = stream.read(&mut buf).await?;
            let fed = if n == 0 {
                tokenizer.finish()
            } else {
                total_bytes += n;
                tokenizer.feed(&buf[..n], &mut writer)
            };
            if let Err(e) = fed {
                warn!("Rejecting chunk after {} bytes: {}", total_bytes, e);
                return Err(e);
            }
            if n == 0 {
                break;
            }
        }

        let rows = writer.rows_written();
        writer.finish()?;

        debug!(
            "Streamed chunk: {} bytes, {} rows x {} cols in {:.2?}",
            total_bytes,
            rows,
            matrix.col_count(),
            start.elapsed()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_small_buffer_parses_chunk() {
        let mut stream = Cursor::new(br#"[["1", null], ["2", "x"]]"#.to_vec());
        let mut matrix = ResultMatrix::allocate(2, 2);

        let parser = Box::new(StreamingChunkParser::new(&mut stream, 3));
        parser.parse_chunk(&mut matrix).await.unwrap();

        assert_eq!(matrix.row_count(), 2);
        assert_eq!(matrix.get(0, 0).unwrap().as_text(), Some("1"));
        assert!(matrix.get(0, 1).unwrap().is_null());
        assert_eq!(matrix.get(1, 1).unwrap().as_text(), Some("x"));
    }

    #[tokio::test]
    async fn test_zero_buffer_size_is_usable() {
        let mut stream = Cursor::new(b"[[]]".to_vec());
        let mut matrix = ResultMatrix::allocate(1, 1);

        let parser = Box::new(StreamingChunkParser::new(&mut stream, 0));
        parser.parse_chunk(&mut matrix).await.unwrap();

        assert_eq!(matrix.row_count(), 1);
        assert_eq!(matrix.col_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_parse_keeps_previous_matrix() {
        let mut stream = Cursor::new(br#"[["a"], ["b"], {"c": 1}]"#.to_vec());
        let mut matrix = ResultMatrix::allocate(1, 1);
        matrix.set(0, 0, "before").unwrap();

        let parser = Box::new(StreamingChunkParser::new(&mut stream, 4));
        let err = parser.parse_chunk(&mut matrix).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedChunk);
        assert_eq!(matrix.row_count(), 1);
        assert_eq!(matrix.get(0, 0).unwrap().as_text(), Some("before"));
    }

    #[tokio::test]
    async fn test_truncated_chunk_rejected_at_end_of_stream() {
        for input in ["[[\"a\"], [\"b\"", "[[\"a\"]", "["] {
            let mut stream = Cursor::new(input.as_bytes().to_vec());
            let mut matrix = ResultMatrix::allocate(1, 1);
            matrix.set(0, 0, "before").unwrap();

            let parser = Box::new(StreamingChunkParser::new(&mut stream, 4));
            let err = parser.parse_chunk(&mut matrix).await.unwrap_err();

            assert_eq!(err.kind(), ErrorKind::MalformedChunk, "input: {}", input);
            assert!(err.message().contains("unexpected end"), "{}", err);
            assert_eq!(matrix.get(0, 0).unwrap().as_text(), Some("before"));
        }
    }

    #[tokio::test]
    async fn test_stream_left_open_for_caller() {
        let mut stream = Cursor::new(b"[ ]  \n".to_vec());
        let mut matrix = ResultMatrix::allocate(0, 2);

        let parser = Box::new(StreamingChunkParser::new(&mut stream, 2));
        parser.parse_chunk(&mut matrix).await.unwrap();

        // Stream is still owned and usable by the caller.
        assert_eq!(stream.position(), 6);
        assert_eq!(matrix.col_count(), 2);
    }
}
