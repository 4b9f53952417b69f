//! Configuration management for reportbox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use reportbox::config::{Config, ConfigProvider};
//!
//! let config = Config::load().expect("Failed to load configuration");
//! if let Some(parser) = config.parser_config("spamcop") {
//!     println!("spamcop enabled: {}", parser.enabled);
//! }
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `REPORTBOX__<section>__<key>`
//!
//! Examples:
//! - `REPORTBOX__RUNTIME__WORKDIR_ROOT=/var/tmp`
//! - `REPORTBOX__PARSERS__SPAMCOP__PARSER__ENABLED=false`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/reportbox.toml`.
//! This can be overridden using the `REPORTBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{Config, FeedConfig, ParserConfig, ParserNamespace, RuntimeConfig};
pub use sources::default_path;
pub use validation::{ConfigIssue, PatternKind};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),
}

/// Read-only view of handler configuration.
///
/// Keys are namespaced as `<handler_id>.parser.*` and
/// `<handler_id>.feeds.<feed>.*`. Implementations must be safe to share
/// between concurrent runs.
pub trait ConfigProvider: Send + Sync {
    fn parser_config(&self, handler_id: &str) -> Option<&ParserConfig>;

    fn feed_config(&self, handler_id: &str, feed: &str) -> Option<&FeedConfig>;
}

impl ConfigProvider for Config {
    fn parser_config(&self, handler_id: &str) -> Option<&ParserConfig> {
        self.parsers
            .get(&handler_id.to_ascii_lowercase())
            .map(|namespace| &namespace.parser)
    }

    fn feed_config(&self, handler_id: &str, feed: &str) -> Option<&FeedConfig> {
        self.parsers
            .get(&handler_id.to_ascii_lowercase())?
            .feeds
            .get(&feed.to_ascii_lowercase())
    }
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or a value
    /// cannot be deserialized into the expected type.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(sources::load()?)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        Ok(sources::load_from_sources(path)?)
    }

    /// Structural checks the dispatcher and runtime would otherwise only hit
    /// at match time
    pub fn check(&self) -> Vec<ConfigIssue> {
        validation::check(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[parsers.spamcop.parser]
name = "Spamcop"
enabled = true
sender_map = ["/@reports\\.spamcop\\.net$/"]
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.parsers.len(), 1);
        assert!(config.check().is_empty());
    }

    #[test]
    fn test_provider_lookups() {
        let config: Config = toml::from_str(
            r#"
[parsers.shadowserver.parser]
name = "Shadowserver"
enabled = true

[parsers.shadowserver.feeds.scan_ntp]
enabled = true
fields = ["ip"]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.parser_config("Shadowserver").and_then(|p| p.name.as_deref()),
            Some("Shadowserver")
        );
        assert!(config.feed_config("shadowserver", "SCAN_NTP").is_some());
        assert!(config.feed_config("shadowserver", "scan_dns").is_none());
        assert!(config.feed_config("spamcop", "scan_ntp").is_none());
        assert!(config.parser_config("spamcop").is_none());
    }

    #[test]
    fn test_check_surfaces_issues_without_failing_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[parsers.broken.parser]
enabled = true
sender_map = ["/(unbalanced/"]
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        let issues = config.check();
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0], ConfigIssue::MissingParserName { .. }));
        assert!(matches!(
            issues[1],
            ConfigIssue::InvalidPattern { kind: PatternKind::Sender, .. }
        ));
    }
}
