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

//! Chunk parsers for turning downloaded result chunks into matrices.
//!
//! This module provides:
//! - `ChunkParser`: the capability shared by every parsing strategy
//! - `ChunkParserFactory`: creates the configured parser for a chunk stream
//! - `StreamingChunkParser`: incremental tokenizer (version 1, default)
//! - `DeserializerChunkParser`: buffered `serde` visitor (version 2)
//! - `TreeChunkParser`: buffered tree of raw JSON values (version 3)
//!
//! All strategies produce identical matrices for the same input; they differ
//! only in how they walk the stream.

pub mod buffered;
pub mod streaming;

use crate::error::{ChunkErrorHelper, Result};
use crate::types::config::{ChunkParserSettings, ChunkParserVersion};
use crate::types::matrix::ResultMatrix;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub use buffered::{DeserializerChunkParser, TreeChunkParser};
pub use streaming::StreamingChunkParser;

/// A single-use parser bound to one chunk stream.
///
/// `parse_chunk` consumes the parser. On success the matrix holds one row per
/// row array in the chunk. On failure the matrix is left as it was before the
/// call. The stream is borrowed, never closed.
#[async_trait]
pub trait ChunkParser: Send {
    /// Strategy implemented by this parser.
    fn version(&self) -> ChunkParserVersion;

    /// Parse the bound stream into `matrix`.
    async fn parse_chunk(self: Box<Self>, matrix: &mut ResultMatrix) -> Result<()>;
}

/// Factory that creates the configured chunk parser for a stream.
///
/// The factory holds no per-call state. Each `get_parser` call reads the
/// parser version from the shared settings once, so a settings change is
/// picked up by the next parser created and never by one already handed out.
#[derive(Debug, Clone)]
pub struct ChunkParserFactory {
    settings: Arc<ChunkParserSettings>,
}

impl ChunkParserFactory {
    /// Create a factory reading the given settings.
    pub fn new(settings: Arc<ChunkParserSettings>) -> Self {
        Self { settings }
    }

    /// Factory backed by the process-wide settings.
    pub fn instance() -> Self {
        Self::new(ChunkParserSettings::global())
    }

    pub fn settings(&self) -> &Arc<ChunkParserSettings> {
        &self.settings
    }

    /// Create a parser bound to `stream` for the currently configured version.
    ///
    /// Fails with a configuration error, without touching the stream, if the
    /// configured version is unknown.
    pub fn get_parser<'a, R>(&self, stream: &'a mut R) -> Result<Box<dyn ChunkParser + 'a>>
    where
        R: AsyncRead + Unpin + Send + ?Sized + 'a,
    {
        let config = self.settings.snapshot();
        let version = ChunkParserVersion::try_from(config.parser_version).map_err(|e| {
            error!("Chunk parser misconfigured: {}", e);
            e
        })?;

        debug!(
            "Creating {} chunk parser (read_buffer_size={})",
            version, config.read_buffer_size
        );

        let parser: Box<dyn ChunkParser + 'a> = match version {
            ChunkParserVersion::Streaming => {
                Box::new(StreamingChunkParser::new(stream, config.read_buffer_size))
            }
            ChunkParserVersion::Deserializer => Box::new(DeserializerChunkParser::new(stream)),
            ChunkParserVersion::Tree => Box::new(TreeChunkParser::new(stream)),
        };
        Ok(parser)
    }
}

impl Default for ChunkParserFactory {
    fn default() -> Self {
        Self::instance()
    }
}

/// Run `parser` until it completes or `cancel_token` fires.
///
/// Cancellation drops the in-flight parse, which stops reading from the
/// stream and discards any staged rows: the matrix keeps its pre-parse
/// contents and a `Cancelled` error is returned.
pub async fn parse_cancellable(
    parser: Box<dyn ChunkParser + '_>,
    matrix: &mut ResultMatrix,
    cancel_token: &CancellationToken,
) -> Result<()> {
    let version = parser.version();
    tokio::select! {
        biased;
        _ = cancel_token.cancelled() => {
            debug!("Chunk parse cancelled ({})", version);
            Err(ChunkErrorHelper::cancelled().message("Chunk parse cancelled"))
        }
        result = parser.parse_chunk(matrix) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::config::ChunkParserConfig;
    use std::io::Cursor;

    fn create_test_factory(version: i64) -> ChunkParserFactory {
        let config = ChunkParserConfig {
            parser_version: version,
            ..Default::default()
        };
        ChunkParserFactory::new(Arc::new(ChunkParserSettings::new(&config)))
    }

    #[test]
    fn test_factory_selects_configured_version() {
        for version in ChunkParserVersion::ALL {
            let factory = create_test_factory(version.id());
            let mut stream = Cursor::new(b"[]".to_vec());
            let parser = factory.get_parser(&mut stream).unwrap();
            assert_eq!(parser.version(), version);
        }
    }

    #[test]
    fn test_factory_rejects_unknown_version_before_reading() {
        let factory = create_test_factory(42);
        let mut stream = Cursor::new(b"[]".to_vec());
        let err = factory.get_parser(&mut stream).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(stream.position(), 0);
    }

    #[tokio::test]
    async fn test_version_change_applies_to_next_parser_only() {
        let factory = create_test_factory(1);
        let mut first_stream = Cursor::new(br#"[["a"]]"#.to_vec());
        let first = factory.get_parser(&mut first_stream).unwrap();

        factory.settings().set_parser_version(3);
        assert_eq!(first.version(), ChunkParserVersion::Streaming);

        let mut matrix = ResultMatrix::allocate(1, 1);
        first.parse_chunk(&mut matrix).await.unwrap();
        assert_eq!(matrix.get(0, 0).unwrap().as_text(), Some("a"));

        let mut second_stream = Cursor::new(b"[]".to_vec());
        let second = factory.get_parser(&mut second_stream).unwrap();
        assert_eq!(second.version(), ChunkParserVersion::Tree);
    }

    #[tokio::test]
    async fn test_parse_cancellable_completes() {
        let factory = create_test_factory(2);
        let mut stream = Cursor::new(br#"[["x", null]]"#.to_vec());
        let mut matrix = ResultMatrix::allocate(1, 2);
        let token = CancellationToken::new();

        let parser = factory.get_parser(&mut stream).unwrap();
        parse_cancellable(parser, &mut matrix, &token).await.unwrap();

        assert_eq!(matrix.get(0, 0).unwrap().as_text(), Some("x"));
        assert!(matrix.get(0, 1).unwrap().is_null());
    }

    #[tokio::test]
    async fn test_parse_cancellable_already_cancelled() {
        let factory = create_test_factory(1);
        let mut stream = Cursor::new(br#"[["x"]]"#.to_vec());
        let mut matrix = ResultMatrix::allocate(1, 1);
        matrix.set(0, 0, "old").unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let parser = factory.get_parser(&mut stream).unwrap();
        let err = parse_cancellable(parser, &mut matrix, &token)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(matrix.get(0, 0).unwrap().as_text(), Some("old"));
    }
}
