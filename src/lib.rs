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

//! Result chunk parsing for Rust
//!
//! This crate turns a downloaded result chunk, a JSON array of row arrays,
//! into a row/column matrix of nullable string cells.
//!
//! ## Overview
//!
//! - [`ChunkParserFactory`] - Creates the configured parser for a chunk stream
//! - [`ChunkParser`] - Single-use parser bound to one stream
//! - [`ResultMatrix`] - Row/column grid of [`Cell`]s filled by a parser
//! - [`ResultChunk`] - Chunk metadata together with its matrix
//!
//! ## Parser Versions
//!
//! | Id | Name | Strategy |
//! |----|------|----------|
//! | 1 | `streaming` | Incremental tokenizer over fixed-size reads (default) |
//! | 2 | `deserializer` | Buffered chunk walked by `serde` visitors |
//! | 3 | `tree` | Buffered chunk parsed into a tree of raw JSON values, then copied |
//!
//! Every version yields the same matrix for the same input.
//!
//! ## Example
//!
//! ```ignore
//! use chunk_rowset::{ClientConfig, OptionValue, ResultMatrix};
//!
//! let mut config = ClientConfig::new();
//! config.set_option("chunk_parser.version", OptionValue::from("deserializer"))?;
//! let factory = config.build_factory()?;
//!
//! let mut matrix = ResultMatrix::allocate(2, 2);
//! let parser = factory.get_parser(&mut stream)?;
//! parser.parse_chunk(&mut matrix).await?;
//! assert_eq!(matrix.get(0, 0)?.as_text(), Some("1"));
//! ```
//!
//! ## Configuration Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `chunk_parser.version` | 1 | Parser id or name |
//! | `chunk_parser.read_buffer_size` | 8192 | Bytes per read for the streaming parser |
//! | `log.level` | unset | Log level for this crate |
//! | `log.file` | unset | Log file path |

pub mod config;
pub mod error;
mod logging;
pub mod reader;
pub mod types;

// Re-export main types
pub use config::{ClientConfig, OptionValue};
pub use error::{ChunkErrorHelper, Error, ErrorKind, Result};
pub use reader::{
    parse_cancellable, ChunkParser, ChunkParserFactory, DeserializerChunkParser,
    StreamingChunkParser, TreeChunkParser,
};
pub use types::{
    Cell, ChunkInfo, ChunkParserConfig, ChunkParserSettings, ChunkParserVersion, MatrixWriter,
    ResultChunk, ResultMatrix,
};
