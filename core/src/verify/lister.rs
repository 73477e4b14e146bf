use std::{path::Path, sync::Arc, time::UNIX_EPOCH};

use async_trait::async_trait;

use crate::{
    exec::{CommandExecutor, ExecRequest, HostSpec, ssh::shell_quote},
    verify::{
        error::{ListError, command_failed, host_unreachable, io_error},
        mask::FileMask,
    },
};

/// ssh reserves this exit status for its own connection failures.
const SSH_CONNECTION_FAILURE: i32 = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: i64,
    /// Modification time in seconds since the Unix epoch.
    pub date: i64,
}

/// Lists regular files of one directory whose names match `mask`, sorted by name.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    async fn list(&self, host: &HostSpec, dir: &str, mask: &FileMask) -> Result<Vec<FileInfo>, ListError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalLister;

#[async_trait]
impl DirectoryLister for LocalLister {
    async fn list(&self, _host: &HostSpec, dir: &str, mask: &FileMask) -> Result<Vec<FileInfo>, ListError> {
        let dir_path = if dir.is_empty() { Path::new(".") } else { Path::new(dir) };
        let mut entries = tokio::fs::read_dir(dir_path)
            .await
            .map_err(|err| io_error(format!("failed to read directory '{dir}': {err}")))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| io_error(format!("failed to iterate directory '{dir}': {err}")))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if !mask.matches(&name) {
                continue;
            }
            let metadata = entry
                .metadata()
                .await
                .map_err(|err| io_error(format!("failed to stat '{name}' in '{dir}': {err}")))?;
            if !metadata.is_file() {
                continue;
            }

            let date = metadata
                .modified()
                .ok()
                .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
                .map(|elapsed| elapsed.as_secs() as i64)
                .unwrap_or(-1);
            files.push(FileInfo {
                name,
                size: metadata.len() as i64,
                date,
            });
        }

        files.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name));
        Ok(files)
    }
}

/// Lists a directory on any host by running `find` through a command executor.
pub struct RemoteLister {
    executor: Arc<dyn CommandExecutor>,
    timeout_seconds: u64,
}

impl RemoteLister {
    pub fn new(executor: Arc<dyn CommandExecutor>, timeout_seconds: u64) -> Self {
        Self {
            executor,
            timeout_seconds,
        }
    }

    pub fn listing_command(dir: &str) -> String {
        let dir = if dir.is_empty() { "." } else { dir };
        format!(
            "find {} -maxdepth 1 -type f -printf '%f\\t%s\\t%T@\\n'",
            shell_quote(dir)
        )
    }
}

#[async_trait]
impl DirectoryLister for RemoteLister {
    async fn list(&self, host: &HostSpec, dir: &str, mask: &FileMask) -> Result<Vec<FileInfo>, ListError> {
        let request = ExecRequest {
            command: Self::listing_command(dir),
            host: host.clone(),
            timeout_seconds: self.timeout_seconds,
            force_cleanup: false,
            third_party: None,
        };

        let result = self
            .executor
            .execute(&request)
            .await
            .map_err(|err| host_unreachable(format!("listing '{dir}' on {host} failed: {err}")))?;

        if result.exit_code == SSH_CONNECTION_FAILURE {
            return Err(host_unreachable(format!(
                "cannot reach {host}: {}",
                result.stderr_text().trim()
            )));
        }
        if !result.succeeded() {
            return Err(command_failed(format!(
                "listing '{dir}' on {host} exited with {}: {}",
                result.exit_code,
                result.stderr_text().trim()
            )));
        }

        let mut files: Vec<FileInfo> = result
            .stdout_text()
            .lines()
            .filter_map(parse_find_line)
            .filter(|file| mask.matches(&file.name))
            .collect();
        files.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name));
        Ok(files)
    }
}

fn parse_find_line(line: &str) -> Option<FileInfo> {
    let mut fields = line.splitn(3, '\t');
    let name = fields.next()?.to_string();
    let size = fields.next()?.trim().parse().ok()?;
    let date_text = fields.next()?.trim();
    let date = date_text
        .split_once('.')
        .map_or(date_text, |(seconds, _)| seconds)
        .parse()
        .ok()?;
    if name.is_empty() {
        return None;
    }
    Some(FileInfo { name, size, date })
}

/// Local directories through the filesystem, remote ones through `find` over ssh.
pub struct HostLister {
    local: LocalLister,
    remote: RemoteLister,
}

impl HostLister {
    pub fn new(remote: RemoteLister) -> Self {
        Self {
            local: LocalLister,
            remote,
        }
    }
}

#[async_trait]
impl DirectoryLister for HostLister {
    async fn list(&self, host: &HostSpec, dir: &str, mask: &FileMask) -> Result<Vec<FileInfo>, ListError> {
        match host {
            HostSpec::Local => self.local.list(host, dir, mask).await,
            HostSpec::Remote(_) => self.remote.list(host, dir, mask).await,
        }
    }
}
