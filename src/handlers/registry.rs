use std::sync::Arc;
use thiserror::Error;

use super::traits::ReportHandler;

/// Identifier reserved for the dispatcher itself
pub const DISPATCHER_ID: &str = "dispatcher";
/// Identifier reserved for the shared handler runtime
pub const RUNTIME_ID: &str = "runtime";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("handler not found: {0}")]
    NotFound(String),
    #[error("handler already registered: {0}")]
    Duplicate(String),
    #[error("handler id is reserved: {0}")]
    Reserved(String),
}

/// Ordered registry of installed report handlers.
///
/// Registration order is dispatch order: the dispatcher evaluates handlers
/// first-match-wins in the order they were registered.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Vec<(String, Arc<dyn ReportHandler>)>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register a handler under an id. Ids are case-insensitive.
    pub fn register(
        &mut self,
        handler_id: impl Into<String>,
        handler: Arc<dyn ReportHandler>,
    ) -> Result<(), RegistryError> {
        let handler_id = handler_id.into().to_ascii_lowercase();

        if handler_id == DISPATCHER_ID || handler_id == RUNTIME_ID {
            return Err(RegistryError::Reserved(handler_id));
        }
        if self.has_handler(&handler_id) {
            return Err(RegistryError::Duplicate(handler_id));
        }

        tracing::debug!(handler = %handler_id, "Registered handler");
        self.handlers.push((handler_id, handler));
        Ok(())
    }

    /// Builder form of [`HandlerRegistry::register`]
    pub fn with(
        mut self,
        handler_id: impl Into<String>,
        handler: Arc<dyn ReportHandler>,
    ) -> Result<Self, RegistryError> {
        self.register(handler_id, handler)?;
        Ok(self)
    }

    pub fn get(&self, handler_id: &str) -> Result<Arc<dyn ReportHandler>, RegistryError> {
        self.handlers
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(handler_id))
            .map(|(_, handler)| handler.clone())
            .ok_or_else(|| RegistryError::NotFound(handler_id.to_string()))
    }

    pub fn has_handler(&self, handler_id: &str) -> bool {
        self.handlers
            .iter()
            .any(|(id, _)| id.eq_ignore_ascii_case(handler_id))
    }

    /// Installed handler ids in dispatch order
    pub fn list_handlers(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|(id, _)| id.as_str())
    }

    /// Installed handlers paired with their ids, in dispatch order
    pub fn handlers(&self) -> impl Iterator<Item = (&str, &Arc<dyn ReportHandler>)> {
        self.handlers
            .iter()
            .map(|(id, handler)| (id.as_str(), handler))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
