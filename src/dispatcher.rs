//! Handler selection for inbound messages.
//!
//! The [`Dispatcher`] walks the registry in registration order and selects
//! the first handler whose configured patterns match:
//!
//! 1. Handlers that are not explicitly enabled are skipped
//! 2. An invalid `report_file` pattern halts dispatch altogether
//! 3. `sender_map` patterns are tried against the `From` header
//! 4. `body_map` patterns are tried against the body, then against each
//!    structured report fragment
//!
//! Invalid sender or body patterns are logged and skipped. There is no
//! scoring: the first match ends dispatch.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::config::{ConfigProvider, ParserConfig};
use crate::handlers::{HandlerRegistry, ReportHandler};
use crate::message::{MailMessage, StructuredReport};
use crate::pattern;

/// What matched a message to its handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSource {
    Sender { pattern: String },
    Body { pattern: String },
    StructuredReport { pattern: String, fragment: usize },
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchSource::Sender { pattern } => write!(f, "sender_map {pattern}"),
            MatchSource::Body { pattern } => write!(f, "body_map {pattern}"),
            MatchSource::StructuredReport { pattern, fragment } => {
                write!(f, "body_map {pattern} (structured report part {fragment})")
            }
        }
    }
}

/// The handler chosen for a message
#[derive(Clone)]
pub struct Selection<'r> {
    pub handler_id: &'r str,
    pub handler: Arc<dyn ReportHandler>,
    pub source: MatchSource,
}

impl fmt::Debug for Selection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("handler_id", &self.handler_id)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Rule engine selecting exactly one handler per message
pub struct Dispatcher<'r> {
    registry: &'r HandlerRegistry,
    config: &'r dyn ConfigProvider,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r HandlerRegistry, config: &'r dyn ConfigProvider) -> Self {
        Self { registry, config }
    }

    /// Select the handler for a message, or `None` when no handler matches
    pub fn select(
        &self,
        message: &MailMessage,
        structured: Option<&StructuredReport>,
    ) -> Option<Selection<'r>> {
        for (handler_id, handler) in self.registry.handlers() {
            let Some(parser) = self.config.parser_config(handler_id) else {
                tracing::info!(handler = handler_id, "Skipping handler without configuration");
                continue;
            };

            if !parser.enabled {
                tracing::info!(handler = handler_id, "Skipping disabled handler");
                continue;
            }

            if let Some(raw) = parser.report_file.as_deref() {
                if let Err(e) = pattern::compile(raw) {
                    tracing::warn!(
                        handler = handler_id,
                        pattern = raw,
                        error = %e,
                        "Invalid report_file pattern, halting dispatch"
                    );
                    return None;
                }
            }

            if let Some(source) = match_parser(handler_id, parser, message, structured) {
                tracing::info!(handler = handler_id, matched = %source, "Selected handler");
                return Some(Selection {
                    handler_id,
                    handler: Arc::clone(handler),
                    source,
                });
            }
        }

        tracing::info!(
            from = message.header("from").unwrap_or_default(),
            "No handler matched message"
        );
        None
    }
}

/// Compiled patterns of one list, skipping (and logging) invalid entries
fn compiled<'p>(
    handler_id: &'p str,
    kind: &'static str,
    patterns: &'p [String],
) -> impl Iterator<Item = (&'p str, Regex)> + 'p {
    patterns.iter().filter_map(move |raw| match pattern::compile(raw) {
        Ok(re) => Some((raw.as_str(), re)),
        Err(e) => {
            tracing::warn!(
                handler = handler_id,
                pattern = raw.as_str(),
                error = %e,
                "Skipping invalid {kind} pattern"
            );
            None
        }
    })
}

fn match_parser(
    handler_id: &str,
    parser: &ParserConfig,
    message: &MailMessage,
    structured: Option<&StructuredReport>,
) -> Option<MatchSource> {
    let from = message.header("from").unwrap_or_default();

    for (raw, re) in compiled(handler_id, "sender_map", &parser.sender_map) {
        if re.is_match(from) {
            return Some(MatchSource::Sender {
                pattern: raw.to_string(),
            });
        }
    }

    for (raw, re) in compiled(handler_id, "body_map", &parser.body_map) {
        if re.is_match(message.body()) {
            return Some(MatchSource::Body {
                pattern: raw.to_string(),
            });
        }

        let fragments = structured.map(StructuredReport::fragments).unwrap_or_default();
        if let Some(fragment) = fragments.iter().position(|part| re.is_match(part)) {
            return Some(MatchSource::StructuredReport {
                pattern: raw.to_string(),
                fragment,
            });
        }
    }

    None
}
