use serde_json::Value;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use reportbox::config::Config;
use reportbox::handlers::{HandlerRegistry, HandlerRuntime, Report, ReportHandler, RunError};
use reportbox::message::MailMessage;
use reportbox::pipeline::{Outcome, Pipeline};

/// Reads `ip,timestamp,...` CSV attachments into the `scan` feed
struct CsvHandler;

impl ReportHandler for CsvHandler {
    fn parse(&self, runtime: &mut HandlerRuntime<'_>) -> Result<(), RunError> {
        for attachment in runtime.report_attachments() {
            let saved = runtime.save_attachment(attachment)?;
            let content = fs::read_to_string(&saved)
                .map_err(|e| RunError::fatal(format!("unreadable report: {e}")))?;

            let mut lines = content.lines();
            let header: Vec<&str> = lines.next().unwrap_or_default().split(',').collect();

            runtime.set_feed("scan");
            if !runtime.is_known_feed()? || !runtime.is_enabled_feed() {
                continue;
            }

            for line in lines.filter(|line| !line.is_empty()) {
                let report: Report = header
                    .iter()
                    .zip(line.split(','))
                    .map(|(key, value)| (key.to_string(), Value::from(value)))
                    .collect();
                runtime.accept(report)?;
            }
        }
        Ok(())
    }
}

/// Requires a structured report and turns each `Key: value` fragment line into a field
struct FeedbackHandler;

impl ReportHandler for FeedbackHandler {
    fn parse(&self, runtime: &mut HandlerRuntime<'_>) -> Result<(), RunError> {
        runtime.set_feed("abuse");
        if !runtime.is_known_feed()? || !runtime.is_enabled_feed() || !runtime.has_arf_mail() {
            return Ok(());
        }

        let Some(structured) = runtime.structured_report() else {
            return Ok(());
        };

        let mut report = Report::new();
        for line in structured.iter().flat_map(str::lines) {
            if let Some((key, value)) = line.split_once(':') {
                report.insert(
                    key.trim().to_ascii_lowercase().replace('-', "_"),
                    Value::from(value.trim()),
                );
            }
        }
        runtime.accept(report)?;
        Ok(())
    }
}

fn create_test_config(workdir_root: &std::path::Path) -> Config {
    let config_toml = r#"
[parsers.csvreport.parser]
name = "CSV reporter"
enabled = true
report_file = "/\\.csv$/i"
sender_map = ["/^abuse@reporter\\.example$/"]

[parsers.csvreport.feeds.scan]
enabled = true
fields = ["ip", "timestamp"]
filters = ["internal"]

[parsers.feedback.parser]
name = "Feedback loop"
enabled = true
body_map = ["/Feedback-Type: abuse/"]

[parsers.feedback.feeds.abuse]
enabled = true
fields = ["source_ip"]
    "#;

    let mut config: Config = toml::from_str(config_toml).expect("Failed to parse test config");
    config.runtime.workdir_root = workdir_root.to_path_buf();
    config
}

fn build_test_pipeline() -> (Pipeline, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(temp_dir.path());
    let settings = config.runtime.clone();

    let registry = HandlerRegistry::new()
        .with("csvreport", Arc::new(CsvHandler))
        .unwrap()
        .with("feedback", Arc::new(FeedbackHandler))
        .unwrap();

    (Pipeline::new(registry, Arc::new(config), settings), temp_dir)
}

const CSV_REPORT: &str = "From: abuse@reporter.example\r\n\
Subject: Daily scan report\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"sep\"\r\n\
\r\n\
--sep\r\n\
Content-Type: text/plain\r\n\
\r\n\
Attached are today's results.\r\n\
--sep\r\n\
Content-Type: text/csv\r\n\
Content-Disposition: attachment; filename=\"scan.CSV\"\r\n\
\r\n\
ip,timestamp,internal,hostname\r\n\
192.0.2.1,2024-01-01 00:00:00,x1,host.example\r\n\
192.0.2.2\r\n\
192.0.2.3,2024-01-01 00:05:00,x3,\r\n\
--sep--\r\n";

const FEEDBACK_REPORT: &str = "From: fbl@isp.example\r\n\
Subject: FW: complaint\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/report; report-type=feedback-report; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain\r\n\
\r\n\
This is an email abuse report\r\n\
--b1\r\n\
Content-Type: message/feedback-report\r\n\
\r\n\
Feedback-Type: abuse\r\n\
Source-IP: 192.0.2.9\r\n\
--b1--\r\n";

#[test]
fn test_csv_report_end_to_end() {
    let (pipeline, temp_dir) = build_test_pipeline();
    let (message, structured) = MailMessage::parse(CSV_REPORT.as_bytes()).unwrap();

    let outcome = pipeline.process(&message, structured.as_ref());
    let Outcome::Parsed {
        handler_id, result, ..
    } = outcome
    else {
        panic!("expected csvreport to be selected");
    };

    assert_eq!(handler_id, "csvreport");
    assert!(result.is_success());
    // the row without a timestamp is rejected
    assert_eq!(result.warning_count, 1);

    let incidents = result.incidents();
    assert_eq!(incidents.len(), 2);
    assert!(incidents.iter().all(|i| i.feed == "scan"));
    assert!(incidents.iter().all(|i| !i.fields.contains_key("internal")));
    assert_eq!(incidents[0].fields["hostname"], Value::from("host.example"));
    assert!(!incidents[1].fields.contains_key("hostname"));

    // working directory removed after the run
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_feedback_report_matches_on_structured_part() {
    let (pipeline, _temp_dir) = build_test_pipeline();
    let (message, structured) = MailMessage::parse(FEEDBACK_REPORT.as_bytes()).unwrap();
    assert!(structured.is_some());

    let outcome = pipeline.process(&message, structured.as_ref());
    let Outcome::Parsed {
        handler_id, result, ..
    } = outcome
    else {
        panic!("expected feedback to be selected");
    };

    assert_eq!(handler_id, "feedback");
    assert!(result.is_success());
    assert_eq!(result.warning_count, 0);
    assert_eq!(
        result.incidents()[0].fields["source_ip"],
        Value::from("192.0.2.9")
    );
}

#[test]
fn test_feedback_without_structured_report_warns() {
    let (pipeline, _temp_dir) = build_test_pipeline();
    let message = MailMessage::builder()
        .from("fbl@isp.example")
        .body("Feedback-Type: abuse")
        .build();

    let outcome = pipeline.process(&message, None);
    let result = outcome.result().unwrap();

    assert!(result.is_success());
    assert!(result.incidents().is_empty());
    // missing ARF plus the empty result set
    assert_eq!(result.warning_count, 2);
}

#[test]
fn test_unmatched_message() {
    let (pipeline, _temp_dir) = build_test_pipeline();
    let message = MailMessage::builder()
        .from("other@example.com")
        .body("Hello there")
        .build();

    assert_eq!(pipeline.process(&message, None), Outcome::NoMatch);
}

#[test]
fn test_working_dir_failure_fails_run() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = create_test_config(temp_dir.path());
    config.runtime.workdir_root = temp_dir.path().join("missing");
    let settings = config.runtime.clone();

    let registry = HandlerRegistry::new()
        .with("csvreport", Arc::new(CsvHandler))
        .unwrap();
    let pipeline = Pipeline::new(registry, Arc::new(config), settings);

    let (message, structured) = MailMessage::parse(CSV_REPORT.as_bytes()).unwrap();
    let outcome = pipeline.process(&message, structured.as_ref());
    let result = outcome.result().unwrap();

    assert!(result.error_status);
    assert!(result.error_message.starts_with("Unable to create directory"));
    assert!(result.data.is_none());
    assert_eq!(pipeline.metrics().snapshot().runs_failed, 1);
}

#[test]
fn test_concurrent_processing() {
    let (pipeline, temp_dir) = build_test_pipeline();
    let (message, structured) = MailMessage::parse(CSV_REPORT.as_bytes()).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let outcome = pipeline.process(&message, structured.as_ref());
                assert_eq!(outcome.result().unwrap().incidents().len(), 2);
            });
        }
    });

    let snapshot = pipeline.metrics().snapshot();
    assert_eq!(snapshot.messages_received, 4);
    assert_eq!(snapshot.runs_succeeded, 4);
    assert_eq!(snapshot.warnings_raised, 4);
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}
