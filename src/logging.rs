//! Logger setup.
//!
//! The crate itself only ever talks to the `log` facade. Binaries and test
//! harnesses that want to see the pool's trace output call [`init_logging`].

use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;

use log::{LevelFilter, SetLoggerError};
use simplelog::{ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger};

/// Environment variable holding the terminal log level (`warn`, `debug`, ...).
pub const LOG_LEVEL_ENV: &str = "RBCORE_LOG";
/// Environment variable naming a file that receives debug-level output.
pub const LOG_FILE_ENV: &str = "RBCORE_LOG_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub term_level: LevelFilter,
    pub file: Option<(PathBuf, LevelFilter)>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            term_level: LevelFilter::Warn,
            file: None,
        }
    }
}

impl LogConfig {
    /// Builds a config from `RBCORE_LOG` / `RBCORE_LOG_FILE`, falling back to
    /// the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(level) = std::env::var(LOG_LEVEL_ENV).ok().and_then(|s| LevelFilter::from_str(&s).ok()) {
            config.term_level = level;
        }
        if let Ok(path) = std::env::var(LOG_FILE_ENV) {
            config.file = Some((PathBuf::from(path), LevelFilter::Debug));
        }

        config
    }
}

/// Installs a `CombinedLogger`: terminal output plus an optional log file.
///
/// Fails if a logger was already installed. A log file that can't be created
/// is skipped with a warning on the terminal logger.
pub fn init_logging(config: &LogConfig) -> Result<(), SetLoggerError> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![
        TermLogger::new(config.term_level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
    ];

    let mut unopened = None;
    if let Some((path, level)) = &config.file {
        match File::create(path) {
            Ok(file) => loggers.push(WriteLogger::new(*level, Config::default(), file)),
            Err(e) => unopened = Some((path.clone(), e)),
        }
    }

    CombinedLogger::init(loggers)?;

    if let Some((path, e)) = unopened {
        warn!("Couldn't open log file {}: {e}", path.display());
    }
    Ok(())
}
