use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Parser namespaces keyed by handler id
    #[serde(default)]
    pub parsers: BTreeMap<String, ParserNamespace>,
}

/// Settings shared by every handler run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Directory under which per-run working directories are created
    #[serde(default = "default_workdir_root")]
    pub workdir_root: PathBuf,
    #[serde(default = "default_workdir_prefix")]
    pub workdir_prefix: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workdir_root: default_workdir_root(),
            workdir_prefix: default_workdir_prefix(),
        }
    }
}

fn default_workdir_root() -> PathBuf {
    std::env::temp_dir()
}

fn default_workdir_prefix() -> String {
    "reportbox-".to_string()
}

/// Everything configured under `parsers.<handler_id>`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ParserNamespace {
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub feeds: BTreeMap<String, FeedConfig>,
}

/// Dispatch rules and identity of one handler (`parsers.<handler_id>.parser`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ParserConfig {
    /// Human readable name, required before a handler may run
    pub name: Option<String>,
    /// Only an explicit `true` enables the handler
    #[serde(default)]
    pub enabled: bool,
    /// Pattern selecting the attachment that carries the report
    pub report_file: Option<String>,
    /// Patterns evaluated in order against the `From` header
    #[serde(default)]
    pub sender_map: Vec<String>,
    /// Patterns evaluated in order against the body and structured report parts
    #[serde(default)]
    pub body_map: Vec<String>,
}

/// One sub-format of a handler (`parsers.<handler_id>.feeds.<feed>`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Fields every record must carry
    #[serde(default, rename = "fields")]
    pub required_fields: Vec<String>,
    /// Fields stripped from every record
    #[serde(default, rename = "filters")]
    pub filter_fields: Vec<String>,
}

impl Config {
    /// Lowercase handler ids and feed names so lookups do not depend on
    /// how a source spelled its keys.
    pub(crate) fn normalize(mut self) -> Self {
        self.parsers = std::mem::take(&mut self.parsers)
            .into_iter()
            .map(|(id, mut namespace)| {
                namespace.feeds = std::mem::take(&mut namespace.feeds)
                    .into_iter()
                    .map(|(feed, config)| (feed.to_ascii_lowercase(), config))
                    .collect();
                (id.to_ascii_lowercase(), namespace)
            })
            .collect();
        self
    }
}
