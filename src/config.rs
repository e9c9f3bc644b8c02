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

//! String-keyed client options for chunk parsing.
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `chunk_parser.version` | 1 | Parser id (1, 2, 3) or name (`streaming`, `deserializer`, `tree`) |
//! | `chunk_parser.read_buffer_size` | 8192 | Bytes per stream read for the streaming parser |
//! | `log.level` | unset | `off`, `error`, `warn`, `info`, `debug`, `trace` |
//! | `log.file` | unset | Log file path, stderr when unset |

use crate::error::{ChunkErrorHelper, Error, Result};
use crate::logging::{init_logging, parse_log_level, LogConfig};
use crate::reader::ChunkParserFactory;
use crate::types::config::{ChunkParserConfig, ChunkParserSettings, ChunkParserVersion};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Value of a client option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Int(i64),
    Double(f64),
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::String(value.to_string())
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

/// Client configuration assembled from options.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    parser: ChunkParserConfig,
    log: LogConfig,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parser_config(&self) -> &ChunkParserConfig {
        &self.parser
    }

    fn invalid_option(key: &str, value: &OptionValue) -> Error {
        ChunkErrorHelper::configuration()
            .message(format!("Invalid value for option '{}': {:?}", key, value))
    }

    /// Parse an integer option value.
    fn parse_int_option(value: &OptionValue) -> Option<i64> {
        match value {
            OptionValue::String(s) => s.trim().parse().ok(),
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn parse_string_option(value: &OptionValue) -> Option<String> {
        match value {
            OptionValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Set an option by key.
    ///
    /// The parser version accepts any integer here; unknown ids are reported
    /// by the factory when a parser is requested. Names must be known.
    pub fn set_option(&mut self, key: &str, value: OptionValue) -> Result<()> {
        match key {
            "chunk_parser.version" => {
                let id = match &value {
                    OptionValue::Int(i) => *i,
                    OptionValue::String(s) => match s.trim().parse::<i64>() {
                        Ok(i) => i,
                        Err(_) => s.parse::<ChunkParserVersion>()?.id(),
                    },
                    OptionValue::Double(_) => return Err(Self::invalid_option(key, &value)),
                };
                self.parser.parser_version = id;
                Ok(())
            }
            "chunk_parser.read_buffer_size" => match Self::parse_int_option(&value) {
                Some(v) if v > 0 => {
                    self.parser.read_buffer_size = v as usize;
                    Ok(())
                }
                _ => Err(Self::invalid_option(key, &value)),
            },
            "log.level" => {
                let level = Self::parse_string_option(&value)
                    .ok_or_else(|| Self::invalid_option(key, &value))?;
                self.log.level = Some(parse_log_level(&level)?);
                Ok(())
            }
            "log.file" => {
                let file = Self::parse_string_option(&value)
                    .ok_or_else(|| Self::invalid_option(key, &value))?;
                self.log.file = Some(PathBuf::from(file));
                Ok(())
            }
            _ => Err(ChunkErrorHelper::configuration()
                .message(format!("Unknown option '{}'", key))),
        }
    }

    /// Read an option back as a string.
    pub fn get_option_string(&self, key: &str) -> Result<String> {
        match key {
            "chunk_parser.version" => Ok(self.parser.parser_version.to_string()),
            "chunk_parser.read_buffer_size" => Ok(self.parser.read_buffer_size.to_string()),
            "log.level" => self.log.level.map(|l| l.to_string()).ok_or_else(|| {
                ChunkErrorHelper::invalid_state().message("option 'log.level' is not set")
            }),
            "log.file" => self
                .log
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .ok_or_else(|| {
                    ChunkErrorHelper::invalid_state().message("option 'log.file' is not set")
                }),
            _ => Err(ChunkErrorHelper::configuration()
                .message(format!("Unknown option '{}'", key))),
        }
    }

    /// Initialize logging and create a factory over fresh settings.
    ///
    /// Fails with an I/O error if the configured log file cannot be opened.
    pub fn build_factory(&self) -> Result<ChunkParserFactory> {
        init_logging(&self.log)?;
        debug!(
            "Building chunk parser factory: version={}, read_buffer_size={}",
            self.parser.parser_version, self.parser.read_buffer_size
        );
        Ok(ChunkParserFactory::new(Arc::new(ChunkParserSettings::new(
            &self.parser,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_set_parser_options() {
        let mut config = ClientConfig::new();
        config
            .set_option("chunk_parser.version", OptionValue::from("deserializer"))
            .unwrap();
        config
            .set_option("chunk_parser.read_buffer_size", OptionValue::from("512"))
            .unwrap();

        assert_eq!(config.parser_config().parser_version, 2);
        assert_eq!(config.parser_config().read_buffer_size, 512);
        assert_eq!(config.get_option_string("chunk_parser.version").unwrap(), "2");
    }

    #[test]
    fn test_unknown_version_id_accepted_until_use() {
        let mut config = ClientConfig::new();
        config
            .set_option("chunk_parser.version", OptionValue::Int(9))
            .unwrap();

        let factory = config.build_factory().unwrap();
        let mut stream = std::io::Cursor::new(b"[]".to_vec());
        let err = factory.get_parser(&mut stream).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_invalid_option_values() {
        let mut config = ClientConfig::new();
        for (key, value) in [
            ("chunk_parser.version", OptionValue::from("fastest")),
            ("chunk_parser.version", OptionValue::Double(1.0)),
            ("chunk_parser.read_buffer_size", OptionValue::Int(0)),
            ("chunk_parser.read_buffer_size", OptionValue::from("lots")),
            ("log.level", OptionValue::Int(3)),
            ("log.level", OptionValue::from("verbose")),
            ("no.such.option", OptionValue::from("x")),
        ] {
            let err = config.set_option(key, value).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "key: {}", key);
        }
        assert_eq!(config.parser_config().parser_version, 1);
        assert!(config.get_option_string("log.level").is_err());
    }

    #[test]
    fn test_log_options() {
        let mut config = ClientConfig::new();
        assert!(config.get_option_string("log.level").is_err());
        config.set_option("log.level", OptionValue::from("DEBUG")).unwrap();
        config
            .set_option("log.file", OptionValue::from("/tmp/chunk-rowset.log"))
            .unwrap();
        assert_eq!(config.get_option_string("log.level").unwrap(), "debug");
        assert_eq!(
            config.get_option_string("log.file").unwrap(),
            "/tmp/chunk-rowset.log"
        );
    }
}
