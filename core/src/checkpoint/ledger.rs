use std::{
    collections::HashSet,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::checkpoint::error::{LedgerError, internal_error, read_error, write_error};

/// Append-only record of commands that already completed, mirrored in memory.
#[derive(Debug)]
pub struct CheckpointLedger {
    path: Option<PathBuf>,
    entries: HashSet<String>,
}

/// Folds line breaks so every entry fits on one line of the checkpoint file.
pub fn ledger_key(command: &str) -> String {
    if !command.contains(['\n', '\r']) {
        return command.to_string();
    }

    command
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}

impl CheckpointLedger {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: HashSet::new(),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(internal_error("checkpoint path cannot be empty"));
        }

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                write_error(format!(
                    "failed to create checkpoint directory '{}': {err}",
                    parent.display()
                ))
            })?;
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(read_error(format!(
                    "failed to read checkpoint file '{}': {err}",
                    path.display()
                )));
            }
        };

        let entries: HashSet<String> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();

        tracing::debug!(
            target: "ledger",
            path = %path.display(),
            entries = entries.len(),
            "checkpoint_loaded"
        );

        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn exists(&self, command: &str) -> bool {
        self.entries.contains(&ledger_key(command))
    }

    pub fn record(&mut self, command: &str) -> Result<(), LedgerError> {
        let key = ledger_key(command);
        if self.entries.contains(&key) {
            return Ok(());
        }

        if let Some(path) = &self.path {
            append_line(path, &key)?;
        }
        self.entries.insert(key);
        Ok(())
    }
}

fn append_line(path: &Path, line: &str) -> Result<(), LedgerError> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| {
            write_error(format!(
                "failed to open checkpoint file '{}': {err}",
                path.display()
            ))
        })?;

    let mut writer = BufWriter::new(file);
    writer
        .write_all(line.as_bytes())
        .and_then(|_| writer.write_all(b"\n"))
        .and_then(|_| writer.flush())
        .map_err(|err| {
            write_error(format!(
                "failed to append checkpoint entry to '{}': {err}",
                path.display()
            ))
        })?;

    writer.get_ref().sync_data().map_err(|err| {
        write_error(format!(
            "failed to sync checkpoint file '{}': {err}",
            path.display()
        ))
    })
}
