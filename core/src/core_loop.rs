use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::{
    processor::FileProcessor,
    types::{Disposition, OutputArtifact, ProcessOutput, SubstitutionPair, WorkItem},
};

/// One NDJSON input line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessRequest {
    pub item: WorkItem,
    #[serde(default)]
    pub substitutions: Vec<SubstitutionPair>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    EndOfInput,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverReport {
    pub exit_reason: ExitReason,
    pub requests: u64,
    pub malformed: u64,
}

pub async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open input {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

/// Feeds each request line through the processor and writes one `ProcessOutput` line per request.
/// Stops at end of input or once `shutdown` is cancelled; an in-flight item is still answered.
pub async fn run_driver<R, W>(
    processor: &mut FileProcessor,
    input: R,
    output: &mut W,
    shutdown: &CancellationToken,
) -> Result<DriverReport>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut requests = 0_u64;
    let mut malformed = 0_u64;

    let exit_reason = loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break ExitReason::Cancelled,
            line = lines.next_line() => line.context("failed to read request line")?,
        };
        let Some(line) = line else {
            break ExitReason::EndOfInput;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        requests += 1;

        let response = match serde_json::from_str::<ProcessRequest>(line) {
            Ok(request) => {
                processor
                    .process(&request.item, &request.substitutions)
                    .await
                    .with_context(|| format!("processing '{}' failed", request.item.name))?
            }
            Err(err) => {
                malformed += 1;
                tracing::warn!(target: "core_loop", error = %err, line = line, "malformed_request");
                ProcessOutput {
                    artifact: OutputArtifact::error_sentinel(&processor.config().error_token),
                    provenance: Vec::new(),
                    disposition: Disposition::Failed {
                        reason: "malformed_request".to_string(),
                    },
                }
            }
        };

        write_output(output, &response).await?;
        if shutdown.is_cancelled() {
            break ExitReason::Cancelled;
        }
    };

    tracing::info!(
        target: "core_loop",
        exit_reason = ?exit_reason,
        requests = requests,
        malformed = malformed,
        "driver_stopped"
    );

    Ok(DriverReport {
        exit_reason,
        requests,
        malformed,
    })
}

async fn write_output<W>(output: &mut W, response: &ProcessOutput) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded =
        serde_json::to_string(response).context("failed to encode process output")?;
    encoded.push('\n');
    output
        .write_all(encoded.as_bytes())
        .await
        .context("failed to write process output")?;
    output.flush().await.context("failed to flush process output")
}
