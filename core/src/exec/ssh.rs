use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    exec::{
        error::ExecError,
        host::HostSpec,
        pool::{SessionPool, SshSession},
        ports::{CommandExecutor, ExecRequest},
        process::{GroupTerminator, PGID_MARKER, PgidSource, RunSpec, run_to_completion},
    },
    types::ExecutionResult,
};

/// Quotes a value for a POSIX shell on the remote side.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "_-./:@%+=,".contains(ch))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r#"'\''"#))
}

/// Prefixes the command so the remote login shell reports its process-group id first.
pub fn wrap_with_pgid_report(command: &str) -> String {
    format!("echo \"{PGID_MARKER} $$\"; {command}")
}

/// Group kill in a form that dash and bash both accept.
pub fn group_kill_command(pgid: u32) -> String {
    format!("kill -KILL -{pgid}")
}

#[derive(Clone)]
pub struct SshExecutor {
    pool: Arc<SessionPool>,
    cancel: CancellationToken,
}

impl SshExecutor {
    pub fn new(pool: Arc<SessionPool>) -> Self {
        Self {
            pool,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(pool: Arc<SessionPool>, cancel: CancellationToken) -> Self {
        Self { pool, cancel }
    }

    pub fn pool(&self) -> &Arc<SessionPool> {
        &self.pool
    }
}

#[async_trait]
impl CommandExecutor for SshExecutor {
    async fn execute(&self, request: &ExecRequest) -> Result<ExecutionResult, ExecError> {
        let HostSpec::Remote(target) = &request.host else {
            return Err(ExecError::InvalidHost {
                spec: request.host.to_string(),
                reason: "ssh executor needs a remote host".to_string(),
            });
        };

        let session = self.pool.session(target);
        let forward_agent = request.third_party.is_some();
        let remote_command = if request.force_cleanup {
            wrap_with_pgid_report(&request.command)
        } else {
            request.command.clone()
        };

        tracing::debug!(
            target: "exec",
            target_host = %target,
            command = %request.command,
            timeout_seconds = request.timeout_seconds,
            force_cleanup = request.force_cleanup,
            third_party = ?request.third_party.as_ref().map(ToString::to_string),
            "ssh_exec_start"
        );

        let command = session.command(&remote_command, forward_agent);
        let terminator = SshGroupTerminator {
            session: Arc::clone(&session),
        };
        run_to_completion(
            command,
            RunSpec {
                program: session.program(),
                timeout_seconds: request.timeout_seconds,
                force_cleanup: request.force_cleanup,
                pgid_source: PgidSource::StdoutMarker,
                cancel: &self.cancel,
            },
            &terminator,
        )
        .await
    }
}

struct SshGroupTerminator {
    session: Arc<SshSession>,
}

#[async_trait]
impl GroupTerminator for SshGroupTerminator {
    async fn terminate_group(&self, pgid: u32) -> Result<(), String> {
        let output = self
            .session
            .command(&group_kill_command(pgid), false)
            .output()
            .await
            .map_err(|err| format!("failed to run ssh for cleanup: {err}"))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    }
}
