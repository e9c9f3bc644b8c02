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

//! Parser selection and tuning configuration.

use crate::error::{ChunkErrorHelper, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Default read buffer for the streaming parser.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Identifier of a chunk parsing strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChunkParserVersion {
    /// Incremental tokenizer writing cells as they are recognized.
    #[default]
    Streaming,
    /// Buffered `serde` visitor writing rows without an intermediate tree.
    Deserializer,
    /// Buffered parse into a tree of raw JSON values, then copied.
    Tree,
}

impl ChunkParserVersion {
    pub const ALL: [ChunkParserVersion; 3] = [
        ChunkParserVersion::Streaming,
        ChunkParserVersion::Deserializer,
        ChunkParserVersion::Tree,
    ];

    /// Numeric identifier used in configuration.
    pub fn id(self) -> i64 {
        match self {
            ChunkParserVersion::Streaming => 1,
            ChunkParserVersion::Deserializer => 2,
            ChunkParserVersion::Tree => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChunkParserVersion::Streaming => "streaming",
            ChunkParserVersion::Deserializer => "deserializer",
            ChunkParserVersion::Tree => "tree",
        }
    }
}

impl TryFrom<i64> for ChunkParserVersion {
    type Error = crate::error::Error;

    fn try_from(id: i64) -> Result<Self> {
        match id {
            1 => Ok(ChunkParserVersion::Streaming),
            2 => Ok(ChunkParserVersion::Deserializer),
            3 => Ok(ChunkParserVersion::Tree),
            other => Err(ChunkErrorHelper::configuration()
                .message(format!("Unsupported chunk parser version: {}", other))),
        }
    }
}

impl FromStr for ChunkParserVersion {
    type Err = crate::error::Error;

    /// Accepts either the numeric id or the case-insensitive name.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(id) = s.parse::<i64>() {
            return Self::try_from(id);
        }
        Self::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ChunkErrorHelper::configuration()
                    .message(format!("Unknown chunk parser version: '{}'", s))
            })
    }
}

impl fmt::Display for ChunkParserVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

/// Configuration for chunk parsing.
#[derive(Debug, Clone)]
pub struct ChunkParserConfig {
    /// Raw parser version id. Validated when a parser is created, not here.
    pub parser_version: i64,
    /// Bytes requested from the stream per read by the streaming parser.
    pub read_buffer_size: usize,
}

impl Default for ChunkParserConfig {
    fn default() -> Self {
        Self {
            parser_version: ChunkParserVersion::default().id(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

/// Shared, mutable parser settings read by a `ChunkParserFactory`.
///
/// Values are stored in atomics so a factory can snapshot them without
/// locking. Updates apply to parsers created afterwards; a parser already
/// bound to a stream keeps the version it was created with.
#[derive(Debug)]
pub struct ChunkParserSettings {
    parser_version: AtomicI64,
    read_buffer_size: AtomicUsize,
}

static GLOBAL_SETTINGS: OnceLock<Arc<ChunkParserSettings>> = OnceLock::new();

impl ChunkParserSettings {
    pub fn new(config: &ChunkParserConfig) -> Self {
        Self {
            parser_version: AtomicI64::new(config.parser_version),
            read_buffer_size: AtomicUsize::new(config.read_buffer_size),
        }
    }

    /// Process-wide settings, initialized with defaults on first use.
    pub fn global() -> Arc<ChunkParserSettings> {
        GLOBAL_SETTINGS
            .get_or_init(|| Arc::new(ChunkParserSettings::default()))
            .clone()
    }

    /// Set the raw parser version id. Unknown ids are rejected later, by the factory.
    pub fn set_parser_version(&self, id: i64) {
        self.parser_version.store(id, Ordering::SeqCst);
    }

    pub fn parser_version(&self) -> i64 {
        self.parser_version.load(Ordering::SeqCst)
    }

    pub fn set_read_buffer_size(&self, size: usize) {
        self.read_buffer_size.store(size, Ordering::SeqCst);
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size.load(Ordering::SeqCst)
    }

    /// Copy of the current values. Each field is read with one atomic load.
    pub fn snapshot(&self) -> ChunkParserConfig {
        ChunkParserConfig {
            parser_version: self.parser_version(),
            read_buffer_size: self.read_buffer_size(),
        }
    }
}

impl Default for ChunkParserSettings {
    fn default() -> Self {
        Self::new(&ChunkParserConfig::default())
    }
}
