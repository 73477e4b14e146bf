use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Xml,
}

/// Operational log of start/skip, success/failure and verification records.
/// Writes are synchronous and every I/O failure is returned to the caller.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    log_file: Option<PathBuf>,
    error_log_file: Option<PathBuf>,
    format: LogFormat,
}

impl EventLog {
    pub fn new(log_file: Option<PathBuf>, error_log_file: Option<PathBuf>, format: LogFormat) -> Self {
        Self {
            log_file,
            error_log_file,
            format,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn error_log_file(&self) -> Option<&Path> {
        self.error_log_file.as_deref()
    }

    pub fn event(&self, header: &str, message: &str) -> io::Result<()> {
        tracing::info!(target: "event_log", header = header, record = message, "event");
        match &self.log_file {
            Some(path) => append(path, self.format, header, message),
            None => Ok(()),
        }
    }

    /// Error records go to the error log, or to the main log when no error log is configured.
    pub fn error(&self, header: &str, message: &str) -> io::Result<()> {
        tracing::warn!(target: "event_log", header = header, record = message, "error_event");
        match self.error_log_file.as_ref().or(self.log_file.as_ref()) {
            Some(path) => append(path, self.format, header, message),
            None => Ok(()),
        }
    }
}

pub fn append(path: &Path, format: LogFormat, header: &str, message: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let record = format_record(format, &timestamp(), header, message);
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(record.as_bytes())?;
    file.flush()
}

fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}

fn format_record(format: LogFormat, timestamp: &str, header: &str, message: &str) -> String {
    match format {
        LogFormat::Text => format!(
            "{timestamp} {}: {}\n",
            single_line(header),
            single_line(message.trim_end())
        ),
        LogFormat::Xml => format!(
            "<entry><time>{}</time><header>{}</header><message>{}</message></entry>\n",
            escape_xml(timestamp),
            escape_xml(header),
            escape_xml(message)
        ),
    }
}

/// Text records are line-delimited, so embedded line breaks become spaces.
fn single_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            other => escaped.push(other),
        }
    }
    escaped
}
