use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::{
    exec::{
        error::ExecError,
        ports::{CommandExecutor, ExecRequest},
        process::{GroupTerminator, PgidSource, RunSpec, run_to_completion},
    },
    types::ExecutionResult,
};

#[cfg(windows)]
const SHELL: (&str, &str) = ("cmd.exe", "/C");
#[cfg(not(windows))]
const SHELL: (&str, &str) = ("/bin/sh", "-c");

#[derive(Clone, Default)]
pub struct LocalExecutor {
    cancel: CancellationToken,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    fn shell_command(command: &str, own_group: bool) -> Command {
        let (program, flag) = SHELL;
        let mut shell = Command::new(program);
        shell.arg(flag).arg(command);
        #[cfg(unix)]
        if own_group {
            shell.process_group(0);
        }
        #[cfg(not(unix))]
        let _ = own_group;
        shell
    }
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    async fn execute(&self, request: &ExecRequest) -> Result<ExecutionResult, ExecError> {
        if let Some(third_party) = &request.third_party {
            tracing::debug!(
                target: "exec",
                third_party = %third_party,
                "third_party_ignored_for_local_command"
            );
        }

        tracing::debug!(
            target: "exec",
            command = %request.command,
            timeout_seconds = request.timeout_seconds,
            force_cleanup = request.force_cleanup,
            "local_exec_start"
        );

        let command = Self::shell_command(&request.command, request.force_cleanup);
        run_to_completion(
            command,
            RunSpec {
                program: SHELL.0,
                timeout_seconds: request.timeout_seconds,
                force_cleanup: request.force_cleanup,
                pgid_source: PgidSource::Child,
                cancel: &self.cancel,
            },
            &LocalGroupTerminator,
        )
        .await
    }
}

struct LocalGroupTerminator;

#[async_trait]
impl GroupTerminator for LocalGroupTerminator {
    async fn terminate_group(&self, pgid: u32) -> Result<(), String> {
        #[cfg(unix)]
        {
            use nix::{
                sys::signal::{Signal, killpg},
                unistd::Pid,
            };

            let pgid = i32::try_from(pgid).map_err(|_| format!("process group id {pgid} is out of range"))?;
            killpg(Pid::from_raw(pgid), Signal::SIGKILL).map_err(|errno| format!("killpg failed: {errno}"))
        }
        #[cfg(not(unix))]
        {
            Err(format!(
                "process-group termination of {pgid} is not supported on this platform"
            ))
        }
    }
}
