use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reportbox::config::{Config, ConfigProvider, default_path};
use reportbox::dispatcher::Dispatcher;
use reportbox::handlers::{HandlerRegistry, HandlerRuntime, RunError};
use reportbox::message::MailMessage;

type CommandResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

fn load_config(path: Option<PathBuf>) -> CommandResult<Config> {
    let path = path.unwrap_or_else(default_path);
    Ok(Config::load_from_path(path)?)
}

/// Print configuration issues; `false` when any were found
pub fn check(config_path: Option<PathBuf>) -> CommandResult<bool> {
    let config = load_config(config_path)?;
    let issues = config.check();

    for issue in &issues {
        println!("{issue}");
    }
    println!(
        "{} parser(s) checked, {} issue(s)",
        config.parsers.len(),
        issues.len()
    );

    Ok(issues.is_empty())
}

// Dispatch only needs ids; the selected handler is never run here.
fn dispatch_only(_runtime: &mut HandlerRuntime<'_>) -> Result<(), RunError> {
    Err(RunError::fatal("no handler logic installed"))
}

pub fn match_message(config_path: Option<PathBuf>, message_path: &Path) -> CommandResult<()> {
    let config = load_config(config_path)?;
    let raw = fs::read(message_path)?;
    let (message, structured) = MailMessage::parse(&raw)?;

    let mut registry = HandlerRegistry::new();
    for handler_id in config.parsers.keys() {
        registry.register(handler_id.as_str(), Arc::new(dispatch_only))?;
    }

    let provider: &dyn ConfigProvider = &config;
    match Dispatcher::new(&registry, provider).select(&message, structured.as_ref()) {
        Some(selection) => println!("{} ({})", selection.handler_id, selection.source),
        None => println!("no match"),
    }

    Ok(())
}
