use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use fileproc::{
    core_loop::{ExitReason, run_driver},
    exec::{CommandExecutor, ExecError, ExecRequest, HostSpec},
    processor::{FileProcessor, ProcessorConfig},
    types::{Disposition, ExecutionResult, OutputArtifact, ProcessOutput},
    verify::{DirectoryLister, FileInfo, FileMask, ListError},
};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct CountingExecutor {
    calls: AtomicUsize,
}

#[async_trait]
impl CommandExecutor for CountingExecutor {
    async fn execute(&self, request: &ExecRequest) -> Result<ExecutionResult, ExecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ExecutionResult {
            exit_code: 0,
            stdout: format!("--ProvenanceInfo name=trace date=1 size=2\nran {}\n", request.command)
                .into_bytes(),
            stderr: Vec::new(),
        })
    }
}

struct EmptyLister;

#[async_trait]
impl DirectoryLister for EmptyLister {
    async fn list(&self, _host: &HostSpec, _dir: &str, _mask: &FileMask) -> Result<Vec<FileInfo>, ListError> {
        Ok(Vec::new())
    }
}

fn processor(executor: &Arc<CountingExecutor>) -> FileProcessor {
    FileProcessor::initialize(
        ProcessorConfig {
            command_template: "proc _INFILE_ -o _OUTFILE_ -q QUALITY".to_string(),
            replace_extension: true,
            new_extension: "out".to_string(),
            check_output: false,
            ..ProcessorConfig::default()
        },
        executor.clone(),
        Arc::new(EmptyLister),
    )
    .expect("processor should initialize")
}

fn decode(output: &[u8]) -> Vec<ProcessOutput> {
    String::from_utf8_lossy(output)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each output line is a ProcessOutput"))
        .collect()
}

#[tokio::test]
async fn every_request_line_gets_one_output_line() {
    let executor = Arc::new(CountingExecutor::default());
    let mut processor = processor(&executor);
    let input = concat!(
        r#"{"item":{"name":"a.dat","size":10,"date":20},"substitutions":[{"name":"QUALITY","value":9}]}"#,
        "\n\n",
        "not json\n",
        r#"{"item":{"name":"a.dat","size":10,"date":20},"substitutions":[{"name":"QUALITY","value":9}]}"#,
        "\n",
        r#"{"item":{"name":"STOP"}}"#,
        "\n",
    );
    let mut output = Vec::new();

    let report = run_driver(
        &mut processor,
        BufReader::new(input.as_bytes()),
        &mut output,
        &CancellationToken::new(),
    )
    .await
    .expect("driver should finish");

    assert_eq!(report.exit_reason, ExitReason::EndOfInput);
    assert_eq!(report.requests, 4);
    assert_eq!(report.malformed, 1);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);

    let outputs = decode(&output);
    assert_eq!(outputs.len(), 4);
    assert_eq!(outputs[0].artifact, OutputArtifact::new("a.out", 10, 20));
    assert_eq!(outputs[0].disposition, Disposition::Executed);
    assert_eq!(outputs[0].provenance, vec![OutputArtifact::new("trace", 2, 1)]);
    assert_eq!(outputs[1].artifact, OutputArtifact::new("ERROR", -1, -1));
    assert_eq!(
        outputs[1].disposition,
        Disposition::Failed {
            reason: "malformed_request".to_string()
        }
    );
    assert_eq!(outputs[2].disposition, Disposition::Skipped);
    assert_eq!(outputs[3].artifact, OutputArtifact::new("STOP", -1, -1));
    assert_eq!(outputs[3].disposition, Disposition::PassThrough);

    let summary = processor.shutdown().expect("shutdown");
    assert_eq!(summary.processed, 3);
}

#[tokio::test]
async fn cancelled_driver_stops_before_reading() {
    let executor = Arc::new(CountingExecutor::default());
    let mut processor = processor(&executor);
    let shutdown = CancellationToken::new();
    shutdown.cancel();
    let mut output = Vec::new();

    let report = run_driver(
        &mut processor,
        BufReader::new(r#"{"item":{"name":"a.dat"}}"#.as_bytes()),
        &mut output,
        &shutdown,
    )
    .await
    .expect("driver should stop cleanly");

    assert_eq!(report.exit_reason, ExitReason::Cancelled);
    assert_eq!(report.requests, 0);
    assert!(output.is_empty());
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}
