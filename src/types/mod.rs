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

//! Type definitions shared by the chunk parsers.
//!
//! - `matrix`: cells, the result matrix and its staged writer
//! - `chunk`: chunk metadata paired with a matrix
//! - `config`: parser version identifiers and settings

pub mod chunk;
pub mod config;
pub mod matrix;

// Re-export commonly used types
pub use chunk::{ChunkInfo, ResultChunk};
pub use config::{ChunkParserConfig, ChunkParserSettings, ChunkParserVersion};
pub use matrix::{Cell, MatrixWriter, ResultMatrix};
