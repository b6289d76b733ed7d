use std::path::Path;

use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing::Level;

use crate::error::Result;
use crate::DEFAULT_BATCH_SIZE;
use crate::DEFAULT_MAX_LEAF_RECORDS;

#[derive(Deserialize, Copy, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    #[serde(rename = "trace")]
    Trace,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "info")]
    Info,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "error")]
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
        .into()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Log {
    pub level: LogLevel,
}

impl Default for Log {
    fn default() -> Self {
        Log {
            level: LogLevel::Info,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Query {
    pub batch_size: usize,
    pub use_star_tree: bool,
}

impl Default for Query {
    fn default() -> Self {
        Query {
            batch_size: DEFAULT_BATCH_SIZE,
            use_star_tree: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StarTree {
    pub max_leaf_records: usize,
    pub skip_star_node_creation: Vec<String>,
}

impl Default for StarTree {
    fn default() -> Self {
        StarTree {
            max_leaf_records: DEFAULT_MAX_LEAF_RECORDS,
            skip_star_node_creation: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub log: Log,
    pub query: Query,
    pub star_tree: StarTree,
}

impl Config {
    /// Loads the config from a toml/yaml/json file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?;

        Ok(cfg.try_deserialize()?)
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log.level.into()
    }
}
