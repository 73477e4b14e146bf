use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::event_log::LogFormat;

fn default_true() -> bool {
    true
}

fn default_stop_token() -> String {
    "STOP".to_string()
}

fn default_error_token() -> String {
    "ERROR".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessorConfig {
    /// `""`, `local`, `localhost`, or `[user@]host[:port]`.
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub command_template: String,
    #[serde(default)]
    pub input_dir: String,
    #[serde(default)]
    pub output_dir: String,
    #[serde(default)]
    pub replace_extension: bool,
    #[serde(default)]
    pub new_extension: String,
    #[serde(default = "default_true")]
    pub check_output: bool,
    /// No path keeps the checkpoint ledger in memory only.
    #[serde(default)]
    pub checkpoint_path: Option<PathBuf>,
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default)]
    pub error_log_path: Option<PathBuf>,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "default_stop_token")]
    pub stop_token: String,
    #[serde(default = "default_error_token")]
    pub error_token: String,
    #[serde(default = "default_true")]
    pub do_processing: bool,
    /// Zero waits indefinitely.
    #[serde(default)]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub force_cleanup: bool,
    #[serde(default)]
    pub third_party_host: Option<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            command_template: String::new(),
            input_dir: String::new(),
            output_dir: String::new(),
            replace_extension: false,
            new_extension: String::new(),
            check_output: true,
            checkpoint_path: None,
            log_path: None,
            error_log_path: None,
            log_format: LogFormat::default(),
            stop_token: default_stop_token(),
            error_token: default_error_token(),
            do_processing: true,
            timeout_seconds: 0,
            force_cleanup: false,
            third_party_host: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorSummary {
    pub processed: u64,
    pub passed_through: u64,
    pub skipped: u64,
    pub executed: u64,
    pub failed: u64,
}
