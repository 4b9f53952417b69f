//! Dispatch-and-run driver.
//!
//! [`Pipeline::process`] takes one inbound message through the whole
//! cycle: select a handler, start its runtime, run the handler logic and
//! close the run with `success()` or `failed()`. Every path out of a run
//! goes through the runtime's cleanup.

use std::sync::Arc;

use crate::config::{ConfigProvider, RuntimeConfig};
use crate::dispatcher::{Dispatcher, MatchSource};
use crate::handlers::{HandlerRegistry, HandlerRuntime, ParseResult};
use crate::message::{MailMessage, StructuredReport};
use crate::observability::Metrics;

/// Result of processing one message
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No handler claimed the message
    NoMatch,
    Parsed {
        handler_id: String,
        source: MatchSource,
        result: ParseResult,
    },
}

impl Outcome {
    pub fn result(&self) -> Option<&ParseResult> {
        match self {
            Outcome::NoMatch => None,
            Outcome::Parsed { result, .. } => Some(result),
        }
    }
}

/// Registry, configuration and runtime settings shared by every message.
///
/// A pipeline is read-only after construction and may process messages from
/// several threads at once; each call owns its own runtime.
pub struct Pipeline {
    registry: HandlerRegistry,
    config: Arc<dyn ConfigProvider>,
    settings: RuntimeConfig,
    metrics: Arc<Metrics>,
}

impl Pipeline {
    pub fn new(
        registry: HandlerRegistry,
        config: Arc<dyn ConfigProvider>,
        settings: RuntimeConfig,
    ) -> Self {
        Self {
            registry,
            config,
            settings,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(&self.registry, self.config.as_ref())
    }

    pub fn process(
        &self,
        message: &MailMessage,
        structured: Option<&StructuredReport>,
    ) -> Outcome {
        self.metrics.message_received();

        let Some(selection) = self.dispatcher().select(message, structured) else {
            self.metrics.message_unmatched();
            return Outcome::NoMatch;
        };

        let span = tracing::info_span!("parser_run", handler = selection.handler_id);
        let result = span.in_scope(|| {
            let mut runtime = match HandlerRuntime::startup(
                selection.handler_id,
                self.config.as_ref(),
                &self.settings,
                message,
                structured,
            ) {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!(error = %e, "Parser startup failed");
                    return ParseResult::failure(e.to_string(), 0);
                }
            };

            match selection.handler.parse(&mut runtime) {
                Ok(()) => runtime.success(),
                Err(e) => runtime.failed(e),
            }
        });

        if result.error_status {
            self.metrics.run_failed();
        } else {
            self.metrics.run_succeeded();
        }
        self.metrics.warnings_raised(result.warning_count);

        Outcome::Parsed {
            handler_id: selection.handler_id.to_string(),
            source: selection.source,
            result,
        }
    }
}
