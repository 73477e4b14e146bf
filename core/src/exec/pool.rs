use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::exec::host::RemoteTarget;

fn default_ssh_program() -> String {
    "ssh".to_string()
}

fn default_connect_timeout_seconds() -> u64 {
    30
}

fn default_control_persist_seconds() -> u64 {
    300
}

fn default_control_dir() -> PathBuf {
    PathBuf::from("./state/ssh")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SshConfig {
    #[serde(default = "default_ssh_program")]
    pub program: String,
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
    /// Reuse one authenticated connection per host through OpenSSH control sockets.
    #[serde(default)]
    pub multiplex: bool,
    #[serde(default = "default_control_dir")]
    pub control_dir: PathBuf,
    #[serde(default = "default_control_persist_seconds")]
    pub control_persist_seconds: u64,
    #[serde(default)]
    pub extra_options: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: default_ssh_program(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            multiplex: false,
            control_dir: default_control_dir(),
            control_persist_seconds: default_control_persist_seconds(),
            extra_options: Vec::new(),
        }
    }
}

/// Everything needed to reach one remote host with the ssh client.
#[derive(Debug)]
pub struct SshSession {
    target: RemoteTarget,
    config: SshConfig,
    control_path: Option<PathBuf>,
}

impl SshSession {
    fn open(target: RemoteTarget, config: SshConfig) -> Self {
        let control_path = config.multiplex.then(|| {
            let file_name: String = target
                .to_string()
                .chars()
                .map(|ch| if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' { ch } else { '_' })
                .collect();
            config.control_dir.join(format!("{file_name}.sock"))
        });

        Self {
            target,
            config,
            control_path,
        }
    }

    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }

    pub fn control_path(&self) -> Option<&PathBuf> {
        self.control_path.as_ref()
    }

    /// ssh argv up to and including the destination, without the remote command.
    pub fn base_args(&self, forward_agent: bool) -> Vec<String> {
        let mut args = self.config.extra_options.clone();
        args.extend([
            "-T".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.connect_timeout_seconds),
        ]);
        if let Some(port) = self.target.port {
            args.extend(["-p".to_string(), port.to_string()]);
        }
        if forward_agent {
            args.push("-A".to_string());
        }
        if let Some(control_path) = &self.control_path {
            args.extend([
                "-o".to_string(),
                "ControlMaster=auto".to_string(),
                "-o".to_string(),
                format!("ControlPath={}", control_path.display()),
                "-o".to_string(),
                format!("ControlPersist={}", self.config.control_persist_seconds),
            ]);
        }
        args.push(self.target.destination());
        args
    }

    pub fn command(&self, remote_command: &str, forward_agent: bool) -> Command {
        let mut command = Command::new(&self.config.program);
        command.args(self.base_args(forward_agent)).arg(remote_command);
        command
    }

    pub fn program(&self) -> &str {
        &self.config.program
    }

    async fn close(&self) {
        let Some(control_path) = &self.control_path else {
            return;
        };
        if !control_path.exists() {
            return;
        }

        let result = Command::new(&self.config.program)
            .arg("-O")
            .arg("exit")
            .arg("-o")
            .arg(format!("ControlPath={}", control_path.display()))
            .arg(self.target.destination())
            .output()
            .await;
        match result {
            Ok(output) if output.status.success() => {
                tracing::debug!(target: "exec", target_host = %self.target, "ssh_master_closed");
            }
            Ok(output) => {
                tracing::warn!(
                    target: "exec",
                    target_host = %self.target,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "ssh_master_close_failed"
                );
            }
            Err(err) => {
                tracing::warn!(target: "exec", target_host = %self.target, error = %err, "ssh_master_close_failed");
            }
        }
    }
}

/// Caller-owned cache of ssh sessions keyed by `user@host:port`.
pub struct SessionPool {
    config: SshConfig,
    sessions: Mutex<BTreeMap<String, Arc<SshSession>>>,
}

impl SessionPool {
    pub fn new(config: SshConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    pub fn session(&self, target: &RemoteTarget) -> Arc<SshSession> {
        let key = target.to_string();
        let mut guard = self.sessions.lock().expect("lock poisoned");
        if let Some(existing) = guard.get(&key) {
            return Arc::clone(existing);
        }

        if self.config.multiplex
            && let Err(err) = std::fs::create_dir_all(&self.config.control_dir)
        {
            tracing::warn!(
                target: "exec",
                dir = %self.config.control_dir.display(),
                error = %err,
                "ssh_control_dir_unavailable"
            );
        }

        let session = Arc::new(SshSession::open(target.clone(), self.config.clone()));
        guard.insert(key, Arc::clone(&session));
        tracing::debug!(target: "exec", target_host = %target, "ssh_session_opened");
        session
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn close_all(&self) {
        let sessions: Vec<Arc<SshSession>> = {
            let mut guard = self.sessions.lock().expect("lock poisoned");
            std::mem::take(&mut *guard).into_values().collect()
        };
        for session in sessions {
            session.close().await;
        }
    }
}
