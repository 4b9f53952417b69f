//! Inbound abuse-report messages.
//!
//! A [`MailMessage`] is immutable once built. It is either assembled
//! directly through [`MailMessageBuilder`] or parsed from raw RFC 5322 bytes,
//! in which case a `multipart/report` message also yields a
//! [`StructuredReport`].

use mailparse::{DispositionType, MailHeaderMap, ParsedMail};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Failed to parse message: {0}")]
    Parse(#[from] mailparse::MailParseError),
}

/// A file attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Header lookup and body access for one inbound message
#[derive(Debug, Clone, Default)]
pub struct MailMessage {
    headers: Vec<(String, String)>,
    body: String,
    attachments: Vec<Attachment>,
}

impl MailMessage {
    pub fn builder() -> MailMessageBuilder {
        MailMessageBuilder::default()
    }

    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Parse a raw message.
    ///
    /// The body is the first inline `text/plain` part. Parts carrying a
    /// filename become attachments. When the top-level type is
    /// `multipart/report`, every sub-part's decoded text becomes a fragment
    /// of the returned [`StructuredReport`], in message order.
    pub fn parse(raw: &[u8]) -> Result<(Self, Option<StructuredReport>), MessageError> {
        let mail = mailparse::parse_mail(raw)?;

        let headers = mail
            .headers
            .iter()
            .map(|header| (header.get_key(), header.get_value()))
            .collect();

        let mut attachments = Vec::new();
        collect_attachments(&mail, &mut attachments)?;

        let body = match first_text_part(&mail) {
            Some(part) => part.get_body()?,
            None if mail.subparts.is_empty() => mail.get_body()?,
            None => String::new(),
        };

        let report = if mail.ctype.mimetype.eq_ignore_ascii_case("multipart/report") {
            let fragments = mail
                .subparts
                .iter()
                .map(|part| part.get_body())
                .collect::<Result<Vec<_>, _>>()?;
            Some(StructuredReport::new(fragments))
        } else {
            None
        };

        tracing::debug!(
            from = mail.headers.get_first_value("From").as_deref().unwrap_or_default(),
            attachments = attachments.len(),
            structured = report.is_some(),
            "Parsed inbound message"
        );

        Ok((
            Self {
                headers,
                body,
                attachments,
            },
            report,
        ))
    }
}

fn filename(part: &ParsedMail<'_>) -> Option<String> {
    part.get_content_disposition()
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .cloned()
}

fn is_attachment(part: &ParsedMail<'_>) -> bool {
    part.get_content_disposition().disposition == DispositionType::Attachment
        || filename(part).is_some()
}

fn first_text_part<'a>(part: &'a ParsedMail<'a>) -> Option<&'a ParsedMail<'a>> {
    if part.subparts.is_empty() {
        let is_text = part.ctype.mimetype.eq_ignore_ascii_case("text/plain");
        return (is_text && !is_attachment(part)).then_some(part);
    }

    part.subparts.iter().find_map(first_text_part)
}

fn collect_attachments(
    part: &ParsedMail<'_>,
    attachments: &mut Vec<Attachment>,
) -> Result<(), MessageError> {
    if let Some(filename) = filename(part) {
        attachments.push(Attachment {
            filename,
            content_type: part.ctype.mimetype.clone(),
            content: part.get_body_raw()?,
        });
    }

    for subpart in &part.subparts {
        collect_attachments(subpart, attachments)?;
    }

    Ok(())
}

/// Builder for messages assembled in code
#[derive(Debug, Default)]
pub struct MailMessageBuilder {
    message: MailMessage,
}

impl MailMessageBuilder {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.message.headers.push((name.into(), value.into()));
        self
    }

    pub fn from(self, value: impl Into<String>) -> Self {
        self.header("From", value)
    }

    pub fn subject(self, value: impl Into<String>) -> Self {
        self.header("Subject", value)
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.message.body = body.into();
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.message.attachments.push(attachment);
        self
    }

    pub fn build(self) -> MailMessage {
        self.message
    }
}

/// Machine-readable parts of a report message, in message order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredReport {
    fragments: Vec<String>,
}

impl StructuredReport {
    pub fn new(fragments: Vec<String>) -> Self {
        Self { fragments }
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(String::as_str)
    }
}
