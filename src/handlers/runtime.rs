use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ConfigProvider, FeedConfig, RuntimeConfig};
use crate::message::{Attachment, MailMessage, StructuredReport};
use crate::pattern;

use super::traits::RunError;
use super::types::{Incident, ParseResult, Report, filter_report, is_set};
use super::workdir::WorkingDir;

/// Per-message state and the guard, filter and aggregation operations every
/// handler composes with.
///
/// One runtime exists per matched message. It exclusively owns the warning
/// counter, the accepted incidents and the working directory, and is consumed
/// by [`HandlerRuntime::success`] or [`HandlerRuntime::failed`].
pub struct HandlerRuntime<'a> {
    handler_id: String,
    parser_name: String,
    config: &'a dyn ConfigProvider,
    settings: &'a RuntimeConfig,
    message: &'a MailMessage,
    structured: Option<&'a StructuredReport>,
    feed_name: Option<String>,
    warning_count: u32,
    incidents: Vec<Incident>,
    workdir: Option<WorkingDir>,
}

impl<'a> HandlerRuntime<'a> {
    /// Resolve the handler's configuration and log the message provenance.
    ///
    /// Fails when `parser.name` is absent or empty.
    pub fn startup(
        handler_id: &str,
        config: &'a dyn ConfigProvider,
        settings: &'a RuntimeConfig,
        message: &'a MailMessage,
        structured: Option<&'a StructuredReport>,
    ) -> Result<Self, RunError> {
        let Some(parser_name) = config
            .parser_config(handler_id)
            .and_then(|parser| parser.name.clone())
            .filter(|name| !name.is_empty())
        else {
            tracing::warn!(handler = handler_id, "Required parser.name is missing");
            return Err(RunError::MissingParserName);
        };

        tracing::info!(
            handler = handler_id,
            parser = %parser_name,
            from = message.header("from").unwrap_or_default(),
            subject = message.header("subject").unwrap_or_default(),
            "Received message"
        );

        Ok(Self {
            handler_id: handler_id.to_string(),
            parser_name,
            config,
            settings,
            message,
            structured,
            feed_name: None,
            warning_count: 0,
            incidents: Vec::new(),
            workdir: None,
        })
    }

    pub fn handler_id(&self) -> &str {
        &self.handler_id
    }

    pub fn parser_name(&self) -> &str {
        &self.parser_name
    }

    pub fn message(&self) -> &'a MailMessage {
        self.message
    }

    pub fn structured_report(&self) -> Option<&'a StructuredReport> {
        self.structured
    }

    pub fn warning_count(&self) -> u32 {
        self.warning_count
    }

    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    /// Designate the feed subsequent guards and filters refer to
    pub fn set_feed(&mut self, feed: impl Into<String>) {
        self.feed_name = Some(feed.into());
    }

    pub fn feed_name(&self) -> Option<&str> {
        self.feed_name.as_deref()
    }

    fn feed_config(&self) -> Option<&'a FeedConfig> {
        let feed = self.feed_name.as_deref()?;
        self.config.feed_config(&self.handler_id, feed)
    }

    /// Count and log a warning raised by handler logic
    pub fn warn(&mut self, message: impl Display) {
        self.warning_count += 1;
        tracing::warn!(
            handler = %self.handler_id,
            parser = %self.parser_name,
            feed = self.feed_name.as_deref().unwrap_or_default(),
            "{message}"
        );
    }

    /// Whether the current feed is configured.
    ///
    /// Fatal when no feed was designated. An unconfigured feed is a counted
    /// warning and `false`, so the caller skips the feed's records.
    pub fn is_known_feed(&mut self) -> Result<bool, RunError> {
        let Some(feed) = self.feed_name.clone() else {
            return Err(RunError::FeedNotSet);
        };

        if self.feed_config().is_none() {
            self.warn(format!(
                "The feed referred as '{feed}' is not configured in the parser {}, \
                 therefore skipping processing of this e-mail",
                self.parser_name
            ));
            return Ok(false);
        }

        Ok(true)
    }

    /// Whether the current feed is explicitly enabled
    pub fn is_enabled_feed(&self) -> bool {
        if self.feed_config().is_some_and(|feed| feed.enabled) {
            return true;
        }

        tracing::warn!(
            handler = %self.handler_id,
            parser = %self.parser_name,
            feed = self.feed_name.as_deref().unwrap_or_default(),
            "The feed is disabled in the configuration, therefore skipping processing of this e-mail"
        );
        false
    }

    /// Whether a structured report came with the message
    pub fn has_arf_mail(&mut self) -> bool {
        if self.structured.is_some() {
            return true;
        }

        let feed = self.feed_name.clone().unwrap_or_default();
        self.warn(format!(
            "The feed referred as '{feed}' has an ARF requirement that was not met"
        ));
        false
    }

    /// Whether `report` carries a set value for every required field of the
    /// current feed. The first missing field is a counted warning.
    pub fn has_required_fields(&mut self, report: &Report) -> bool {
        let Some(feed) = self.feed_config() else {
            return true;
        };

        let missing = feed
            .required_fields
            .iter()
            .filter(|field| !field.is_empty())
            .find(|field| !report.get(field.as_str()).is_some_and(is_set));

        match missing {
            None => true,
            Some(field) => {
                let feed_name = self.feed_name.clone().unwrap_or_default();
                self.warn(format!(
                    "{} feed '{feed_name}' says {field} is required but is missing, \
                     therefore skipping processing of this incident",
                    self.parser_name
                ));
                false
            }
        }
    }

    /// Strip the current feed's filtered fields and, when `remove_empty` is
    /// set, empty values. Boolean values are never treated as empty.
    pub fn apply_filters(&self, report: Report, remove_empty: bool) -> Report {
        let filters = self
            .feed_config()
            .map(|feed| feed.filter_fields.as_slice())
            .unwrap_or_default();

        filter_report(report, filters, remove_empty)
    }

    /// Add a prepared record to the result set under the current feed
    pub fn push_incident(&mut self, fields: Report) -> Result<(), RunError> {
        let feed = self.feed_name.clone().ok_or(RunError::FeedNotSet)?;
        self.incidents.push(Incident { feed, fields });
        Ok(())
    }

    /// Validate, filter and accept one record. Returns `false` when the
    /// record was rejected for a missing required field.
    pub fn accept(&mut self, report: Report) -> Result<bool, RunError> {
        if self.feed_name.is_none() {
            return Err(RunError::FeedNotSet);
        }
        if !self.has_required_fields(&report) {
            return Ok(false);
        }

        let fields = self.apply_filters(report, true);
        self.push_incident(fields)?;
        Ok(true)
    }

    /// Attachments whose filename matches the handler's `report_file`
    /// pattern, or every attachment when none is configured
    pub fn report_attachments(&mut self) -> Vec<&'a Attachment> {
        let message: &'a MailMessage = self.message;
        let attachments = message.attachments();
        let report_file = self
            .config
            .parser_config(&self.handler_id)
            .and_then(|parser| parser.report_file.as_deref());

        let Some(raw) = report_file else {
            return attachments.iter().collect();
        };

        match pattern::compile(raw) {
            Ok(re) => attachments
                .iter()
                .filter(|attachment| re.is_match(&attachment.filename))
                .collect(),
            Err(e) => {
                self.warn(format!("Invalid report_file pattern '{raw}': {e}"));
                Vec::new()
            }
        }
    }

    /// The run's working directory, created on first use
    pub fn create_working_dir(&mut self) -> Result<&Path, RunError> {
        let workdir = match self.workdir.take() {
            Some(existing) => existing,
            None => WorkingDir::create(&self.settings.workdir_root, &self.settings.workdir_prefix)?,
        };

        Ok(self.workdir.insert(workdir).path())
    }

    /// Write an attachment into the working directory
    pub fn save_attachment(&mut self, attachment: &Attachment) -> Result<PathBuf, RunError> {
        let name = Path::new(&attachment.filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "attachment".into());

        let path = self.create_working_dir()?.join(name);
        fs::write(&path, &attachment.content).map_err(|source| RunError::WriteFile {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }

    /// Remove the working directory if one was acquired
    pub fn cleanup(&mut self) {
        if let Some(mut workdir) = self.workdir.take() {
            workdir.remove();
        }
    }

    /// End the run with an error
    pub fn failed(mut self, message: impl Display) -> ParseResult {
        self.cleanup();

        let message = message.to_string();
        tracing::warn!(
            handler = %self.handler_id,
            parser = %self.parser_name,
            error = %message,
            "Parser run has ended with errors"
        );

        ParseResult::failure(message, self.warning_count)
    }

    /// End the run with the accepted incidents. An empty result set is
    /// itself a counted warning.
    pub fn success(mut self) -> ParseResult {
        self.cleanup();

        if self.incidents.is_empty() {
            self.warn(
                "The parser did not return any incidents which should be investigated \
                 for parser and/or configuration errors",
            );
        }

        tracing::info!(
            handler = %self.handler_id,
            parser = %self.parser_name,
            incidents = self.incidents.len(),
            warnings = self.warning_count,
            "Parser run completed"
        );

        ParseResult::success(self.incidents, self.warning_count)
    }
}
