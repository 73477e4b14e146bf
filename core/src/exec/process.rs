use std::{process::Stdio, sync::OnceLock};

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
    time::{Duration, sleep, timeout},
};
use tokio_util::sync::CancellationToken;

use crate::{
    exec::error::{CleanupReport, ExecError},
    types::ExecutionResult,
};

/// First stdout line printed by a wrapped remote command, followed by its process-group id.
pub const PGID_MARKER: &str = "__FILEPROC_PGID__";

const TERMINATE_TIMEOUT: Duration = Duration::from_secs(15);
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Delivers SIGKILL to a whole process group, wherever that group lives.
#[async_trait]
pub trait GroupTerminator: Send + Sync {
    async fn terminate_group(&self, pgid: u32) -> Result<(), String>;
}

/// Where the process-group id of a running command comes from.
pub enum PgidSource {
    /// The spawned child leads its own group.
    Child,
    /// The remote shell reports `$$` on the first stdout line.
    StdoutMarker,
}

pub struct RunSpec<'a> {
    pub program: &'a str,
    pub timeout_seconds: u64,
    pub force_cleanup: bool,
    pub pgid_source: PgidSource,
    pub cancel: &'a CancellationToken,
}

enum Interruption {
    Timeout,
    Cancelled,
}

pub async fn run_to_completion(
    mut command: Command,
    spec: RunSpec<'_>,
    terminator: &dyn GroupTerminator,
) -> Result<ExecutionResult, ExecError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| ExecError::Spawn {
        program: spec.program.to_string(),
        source,
    })?;
    let child_pid = child.id();

    let marker_slot = OnceLock::new();
    let watch_marker = matches!(spec.pgid_source, PgidSource::StdoutMarker);
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let interruption = {
        let completion = async {
            tokio::join!(
                child.wait(),
                read_stream(stdout, watch_marker.then_some(&marker_slot)),
                read_stream(stderr, None),
            )
        };

        tokio::select! {
            (status, stdout, stderr) = completion => {
                let status = status.map_err(ExecError::Wait)?;
                let stdout = stdout.map_err(ExecError::Wait)?;
                let stderr = stderr.map_err(ExecError::Wait)?;
                return Ok(ExecutionResult {
                    exit_code: status.code().unwrap_or(-1),
                    stdout: if watch_marker { strip_marker_line(stdout) } else { stdout },
                    stderr,
                });
            }
            _ = deadline(spec.timeout_seconds) => Interruption::Timeout,
            _ = spec.cancel.cancelled() => Interruption::Cancelled,
        }
    };

    let cleanup = if spec.force_cleanup {
        let pgid = match spec.pgid_source {
            PgidSource::Child => child_pid,
            PgidSource::StdoutMarker => marker_slot.get().copied(),
        };
        match pgid {
            Some(pgid) => {
                let delivered = match timeout(TERMINATE_TIMEOUT, terminator.terminate_group(pgid)).await {
                    Ok(Ok(())) => true,
                    Ok(Err(err)) => {
                        tracing::warn!(target: "exec", pgid = pgid, error = %err, "group_terminate_failed");
                        false
                    }
                    Err(_) => {
                        tracing::warn!(target: "exec", pgid = pgid, "group_terminate_timed_out");
                        false
                    }
                };
                CleanupReport::ProcessGroup { pgid, delivered }
            }
            None => CleanupReport::Unavailable {
                reason: "process group id was not reported before the deadline".to_string(),
            },
        }
    } else {
        CleanupReport::ChildKilled
    };

    if let Err(err) = child.start_kill() {
        tracing::debug!(target: "exec", error = %err, "child_kill_failed");
    }
    let _ = child.wait().await;

    match interruption {
        Interruption::Timeout => {
            tracing::warn!(
                target: "exec",
                program = spec.program,
                timeout_seconds = spec.timeout_seconds,
                cleanup = ?cleanup,
                "command_timed_out"
            );
            Err(ExecError::TimedOut {
                timeout_seconds: spec.timeout_seconds,
                cleanup,
            })
        }
        Interruption::Cancelled => {
            tracing::info!(target: "exec", program = spec.program, cleanup = ?cleanup, "command_cancelled");
            Err(ExecError::Cancelled { cleanup })
        }
    }
}

async fn deadline(timeout_seconds: u64) {
    if timeout_seconds == 0 {
        std::future::pending::<()>().await;
    } else {
        sleep(Duration::from_secs(timeout_seconds)).await;
    }
}

async fn read_stream<R>(reader: Option<R>, marker_slot: Option<&OnceLock<u32>>) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(Vec::new());
    };

    let mut buffer = Vec::new();
    let mut chunk = vec![0_u8; READ_CHUNK_BYTES];
    let mut marker_checked = marker_slot.is_none();
    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);

        if !marker_checked && let Some(line_end) = buffer.iter().position(|byte| *byte == b'\n') {
            marker_checked = true;
            if let (Some(slot), Some(pgid)) = (marker_slot, parse_marker(&buffer[..line_end])) {
                let _ = slot.set(pgid);
            }
        }
    }

    Ok(buffer)
}

fn parse_marker(line: &[u8]) -> Option<u32> {
    let line = std::str::from_utf8(line).ok()?.trim();
    line.strip_prefix(PGID_MARKER)?.trim().parse().ok()
}

fn strip_marker_line(stdout: Vec<u8>) -> Vec<u8> {
    let line_end = stdout
        .iter()
        .position(|byte| *byte == b'\n')
        .unwrap_or(stdout.len());
    if parse_marker(&stdout[..line_end]).is_none() {
        return stdout;
    }

    let rest = (line_end + 1).min(stdout.len());
    stdout[rest..].to_vec()
}
