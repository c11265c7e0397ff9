/// Tagged console logger.
///
/// Progress and retries print to standard output continuously during a run;
/// the error ledger (see `output.rs`) is the durable record. Debug lines are
/// only shown when `--debug` is passed.
use chrono::Utc;
use colored::*;
use std::io::{self, Write};

use crate::arguments::is_debug_enabled;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    System,
    Config,
    Assets,
    Clients,
    Resolver,
    Reader,
    Retry,
    Report,
}

impl LogTag {
    fn label(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Config => "CONFIG",
            LogTag::Assets => "ASSETS",
            LogTag::Clients => "CLIENTS",
            LogTag::Resolver => "RESOLVER",
            LogTag::Reader => "READER",
            LogTag::Retry => "RETRY",
            LogTag::Report => "REPORT",
        }
    }
}

fn timestamp() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}

fn write_line(symbol: ColoredString, tag: LogTag, message: &str) {
    println!(
        "{} {} {} {}",
        symbol,
        tag.label().bold(),
        format!("[{}]", timestamp()).dimmed(),
        message
    );
    io::stdout().flush().ok();
}

pub fn info(tag: LogTag, message: &str) {
    write_line("ℹ".blue().bold(), tag, message);
}

pub fn success(tag: LogTag, message: &str) {
    write_line("✅".green().bold(), tag, message);
}

pub fn warning(tag: LogTag, message: &str) {
    println!(
        "{} {} {} {}",
        "⚠".yellow().bold(),
        tag.label().bold(),
        format!("[{}]", timestamp()).dimmed(),
        message.yellow()
    );
    io::stdout().flush().ok();
}

pub fn error(tag: LogTag, message: &str) {
    println!(
        "{} {} {} {}",
        "❌".red().bold(),
        tag.label().bold(),
        format!("[{}]", timestamp()).dimmed(),
        message.red()
    );
    io::stdout().flush().ok();
}

pub fn debug(tag: LogTag, message: &str) {
    if !is_debug_enabled() {
        return;
    }
    println!(
        "{} {} {} {}",
        "🐛".purple().bold(),
        tag.label().bold(),
        format!("[{}]", timestamp()).dimmed(),
        message.dimmed()
    );
    io::stdout().flush().ok();
}
