use std::path::PathBuf;
use thiserror::Error;

use super::runtime::HandlerRuntime;

/// Errors that terminate a handler run.
///
/// The runtime turns any of these into a failed `ParseResult`; handler logic
/// propagates them with `?`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Required parser.name is missing in parser configuration")]
    MissingParserName,
    #[error("Parser did not set the required feedName value")]
    FeedNotSet,
    #[error("Unable to create directory {path}: {source}")]
    WorkingDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Fatal(String),
}

impl RunError {
    pub fn fatal(message: impl Into<String>) -> Self {
        RunError::Fatal(message.into())
    }
}

/// Report-format specific extraction logic.
///
/// A handler is selected by the dispatcher and then handed a
/// [`HandlerRuntime`] for the message. It designates feeds, walks the body,
/// attachments or structured report, and feeds records through the runtime's
/// guards and filters. Returning `Ok(())` ends the run through
/// `success()`, returning an error ends it through `failed()`.
pub trait ReportHandler: Send + Sync {
    fn parse(&self, runtime: &mut HandlerRuntime<'_>) -> Result<(), RunError>;
}

impl<F> ReportHandler for F
where
    F: Fn(&mut HandlerRuntime<'_>) -> Result<(), RunError> + Send + Sync,
{
    fn parse(&self, runtime: &mut HandlerRuntime<'_>) -> Result<(), RunError> {
        self(runtime)
    }
}
