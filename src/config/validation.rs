use super::models::Config;
use crate::pattern::{self, PatternError};
use std::fmt;

/// Which configured pattern list an issue refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    ReportFile,
    Sender,
    Body,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::ReportFile => f.write_str("report_file"),
            PatternKind::Sender => f.write_str("sender_map"),
            PatternKind::Body => f.write_str("body_map"),
        }
    }
}

/// A structural problem that would surface when the dispatcher or runtime
/// reaches the affected handler. Issues never fail the configuration load.
#[derive(Debug, thiserror::Error)]
pub enum ConfigIssue {
    #[error("Parser '{handler}' has no parser.name")]
    MissingParserName { handler: String },

    #[error("Parser '{handler}' has an invalid {kind} pattern '{pattern}': {source}")]
    InvalidPattern {
        handler: String,
        kind: PatternKind,
        pattern: String,
        #[source]
        source: PatternError,
    },
}

/// Run the structural checks on every configured parser
pub fn check(config: &Config) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    for (handler, namespace) in &config.parsers {
        let parser = &namespace.parser;

        if parser.name.as_deref().is_none_or(str::is_empty) {
            issues.push(ConfigIssue::MissingParserName {
                handler: handler.clone(),
            });
        }

        let patterns = parser
            .report_file
            .iter()
            .map(|p| (PatternKind::ReportFile, p))
            .chain(parser.sender_map.iter().map(|p| (PatternKind::Sender, p)))
            .chain(parser.body_map.iter().map(|p| (PatternKind::Body, p)));

        for (kind, raw) in patterns {
            if let Err(source) = pattern::compile(raw) {
                issues.push(ConfigIssue::InvalidPattern {
                    handler: handler.clone(),
                    kind,
                    pattern: raw.clone(),
                    source,
                });
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        toml::from_str(
            r#"
[parsers.spamcop.parser]
name = "Spamcop"
enabled = true
report_file = "/\\.txt$/"
sender_map = ["/@reports\\.spamcop\\.net$/"]
body_map = ["/spamcop/i"]
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config() {
        let config = create_test_config();
        assert!(check(&config).is_empty());
    }

    #[test]
    fn test_missing_name() {
        let mut config = create_test_config();
        config.parsers.get_mut("spamcop").unwrap().parser.name = None;

        let issues = check(&config);
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0], ConfigIssue::MissingParserName { .. }));
    }

    #[test]
    fn test_empty_name_counts_as_missing() {
        let mut config = create_test_config();
        config.parsers.get_mut("spamcop").unwrap().parser.name = Some(String::new());

        assert!(matches!(
            check(&config).as_slice(),
            [ConfigIssue::MissingParserName { .. }]
        ));
    }

    #[test]
    fn test_invalid_patterns_reported_per_kind() {
        let mut config = create_test_config();
        let parser = &mut config.parsers.get_mut("spamcop").unwrap().parser;
        parser.report_file = Some("/[unclosed/".to_string());
        parser.body_map.push("/ok/".to_string());
        parser.body_map.push("/(/".to_string());

        let issues = check(&config);
        assert_eq!(issues.len(), 2);
        assert!(matches!(
            issues[0],
            ConfigIssue::InvalidPattern { kind: PatternKind::ReportFile, .. }
        ));
        assert!(matches!(
            issues[1],
            ConfigIssue::InvalidPattern { kind: PatternKind::Body, .. }
        ));
    }

    #[test]
    fn test_empty_sender_pattern_reported() {
        let mut config = create_test_config();
        config.parsers.get_mut("spamcop").unwrap().parser.sender_map = vec![String::new()];

        assert!(matches!(
            check(&config).as_slice(),
            [ConfigIssue::InvalidPattern {
                kind: PatternKind::Sender,
                source: PatternError::Empty,
                ..
            }]
        ));
    }
}
