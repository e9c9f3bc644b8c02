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

//! Logging setup for chunk parsing.
//!
//! `ClientConfig::build_factory()` installs one `tracing-subscriber` registry
//! per process, filtered to this crate's target.
//!
//! ## Level priority
//!
//! 1. `log.level` client option (validated when the option is set)
//! 2. `RUST_LOG` environment variable
//! 3. Default: `warn`
//!
//! ```bash
//! RUST_LOG=chunk_rowset=debug ./my_app
//! ```

use crate::error::{ChunkErrorHelper, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, time::SystemTime, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_TARGET: &str = "chunk_rowset";

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Logging configuration set through `ClientConfig` options.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogConfig {
    pub level: Option<LevelFilter>,
    /// Appended to when set, stderr otherwise.
    pub file: Option<PathBuf>,
}

/// Parse a `log.level` value: a level name in any case, or `0` (off) to `5` (trace).
pub(crate) fn parse_log_level(value: &str) -> Result<LevelFilter> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ChunkErrorHelper::configuration().message("Empty log level"));
    }
    value.parse::<LevelFilter>().map_err(|_| {
        ChunkErrorHelper::configuration().message(format!("Invalid log level '{}'", value))
    })
}

fn build_filter(level: Option<LevelFilter>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(format!("{}={}", LOG_TARGET, level)),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{}=warn", LOG_TARGET))),
    }
}

/// Writer for the configured destination, and whether it takes ANSI colors.
fn build_writer(file: Option<&Path>) -> Result<(BoxMakeWriter, bool)> {
    match file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    ChunkErrorHelper::io().message(format!(
                        "Failed to open log file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
            Ok((BoxMakeWriter::new(Mutex::new(file)), false))
        }
        None => Ok((BoxMakeWriter::new(std::io::stderr), true)),
    }
}

/// Install the subscriber unless logging is already set up.
///
/// A level of `off` installs nothing. If another subscriber is already the
/// global default this crate's one is not installed and no error is raised.
pub(crate) fn init_logging(config: &LogConfig) -> Result<()> {
    if LOGGING_INITIALIZED.get().is_some() || config.level == Some(LevelFilter::OFF) {
        return Ok(());
    }
    let (writer, ansi) = build_writer(config.file.as_deref())?;

    LOGGING_INITIALIZED.get_or_init(|| {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(false)
            .with_ansi(ansi)
            .with_timer(SystemTime);
        tracing_subscriber::registry()
            .with(build_filter(config.level))
            .with(layer)
            .try_init()
            .ok();
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_log_level(" warn ").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_log_level("OFF").unwrap(), LevelFilter::OFF);
        assert_eq!(parse_log_level("5").unwrap(), LevelFilter::TRACE);

        for bad in ["", "verbose", "9"] {
            let err = parse_log_level(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "level: {:?}", bad);
        }
    }

    #[test]
    fn test_explicit_level_targets_this_crate() {
        let filter = build_filter(Some(LevelFilter::DEBUG));
        assert_eq!(filter.to_string(), "chunk_rowset=debug");
    }

    #[test]
    fn test_log_file_writer() {
        let path = std::env::temp_dir().join("chunk-rowset-logging-test.log");
        let (_, ansi) = build_writer(Some(path.as_path())).unwrap();
        assert!(!ansi);
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);

        let missing = Path::new("/nonexistent-chunk-rowset-dir/out.log");
        let err = build_writer(Some(missing)).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_init_logging_off_installs_nothing() {
        let config = LogConfig {
            level: Some(LevelFilter::OFF),
            file: Some(PathBuf::from("/nonexistent-chunk-rowset-dir/out.log")),
        };
        init_logging(&config).unwrap();
    }
}
