//! Handler system for reportbox
//!
//! Handlers carry the report-format specific extraction logic. Everything
//! they share lives in [`HandlerRuntime`]: configuration lookup, feed and
//! record guards, field filtering, the scoped working directory and the
//! success/failure protocol.
//!
//! ## Key Components
//!
//! - [`ReportHandler`] - Trait implemented by handler logic
//! - [`HandlerRegistry`] - Ordered registry of installed handlers
//! - [`HandlerRuntime`] - Per-message guards, filters and result aggregation
//! - [`ParseResult`] - The only value a run returns
//!
//! ## Example
//!
//! ```rust,ignore
//! use reportbox::handlers::{HandlerRuntime, Report, RunError};
//!
//! fn parse(runtime: &mut HandlerRuntime<'_>) -> Result<(), RunError> {
//!     runtime.set_feed("spam");
//!     if !runtime.is_known_feed()? || !runtime.is_enabled_feed() {
//!         return Ok(());
//!     }
//!     let mut report = Report::new();
//!     report.insert("ip".into(), "192.0.2.1".into());
//!     runtime.accept(report)?;
//!     Ok(())
//! }
//! ```

mod registry;
mod runtime;
mod traits;
mod types;
mod workdir;

pub use registry::{DISPATCHER_ID, HandlerRegistry, RUNTIME_ID, RegistryError};
pub use runtime::HandlerRuntime;
pub use traits::{ReportHandler, RunError};
pub use types::{Incident, ParseResult, Report, SUCCESS_MESSAGE, filter_report};
pub use workdir::WorkingDir;
