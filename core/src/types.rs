use std::fmt;

use serde::{Deserialize, Serialize};

/// Size/date value carried by sentinel records.
pub const UNKNOWN_METRIC: i64 = -1;

/// One unit of file-like work, or a stop/error sentinel when `name` equals a configured token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub name: String,
    #[serde(default = "unknown_metric")]
    pub size: i64,
    #[serde(default = "unknown_metric")]
    pub date: i64,
}

impl WorkItem {
    pub fn new(name: impl Into<String>, size: i64, date: i64) -> Self {
        Self {
            name: name.into(),
            size,
            date,
        }
    }
}

fn unknown_metric() -> i64 {
    UNKNOWN_METRIC
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(value) => write!(f, "{value}"),
            ParamValue::Int(value) => write!(f, "{value}"),
            ParamValue::Float(value) => write!(f, "{value}"),
            ParamValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionPair {
    pub name: String,
    pub value: ParamValue,
}

impl SubstitutionPair {
    pub fn new(name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub name: String,
    pub size: i64,
    pub date: i64,
}

impl OutputArtifact {
    pub fn new(name: impl Into<String>, size: i64, date: i64) -> Self {
        Self {
            name: name.into(),
            size,
            date,
        }
    }

    pub fn error_sentinel(error_token: &str) -> Self {
        Self::new(error_token, UNKNOWN_METRIC, UNKNOWN_METRIC)
    }

    pub fn from_item(item: &WorkItem) -> Self {
        Self::new(item.name.clone(), item.size, item.date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    PassThrough,
    Skipped,
    Executed,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub artifact: OutputArtifact,
    #[serde(default)]
    pub provenance: Vec<OutputArtifact>,
    pub disposition: Disposition,
}

impl ProcessOutput {
    pub fn is_error(&self) -> bool {
        matches!(self.disposition, Disposition::Failed { .. })
    }
}
