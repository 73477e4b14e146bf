use std::fs;

use fileproc::{
    event_log::LogFormat,
    exec::{CleanupReport, ExecError},
    processor::{FileProcessor, ProcessorConfig, ProcessorErrorKind},
    types::{Disposition, OutputArtifact, WorkItem},
    verify::{ListError, ListErrorKind},
};

use crate::support::{FakeExecutor, FakeLister, file, processor, scenario_config, temp_dir};

#[tokio::test]
async fn non_zero_exit_emits_the_error_sentinel_and_keeps_the_ledger() {
    let dir = temp_dir("processor-failure");
    let checkpoint = dir.join("checkpoint.txt");
    let error_log = dir.join("errors.log");
    let executor = FakeExecutor::exiting(1, "", "proc: cannot open a.1234.dat\n");
    let lister = FakeLister::with_files(vec![file("a.1234.out", 100, 1_700_000_000)]);
    let mut processor = processor(
        ProcessorConfig {
            checkpoint_path: Some(checkpoint.clone()),
            log_path: Some(dir.join("events.log")),
            error_log_path: Some(error_log.clone()),
            ..scenario_config()
        },
        &executor,
        &lister,
    );

    let output = processor
        .process(&WorkItem::new("a.1234.dat", 42, 1_600_000_000), &[])
        .await
        .expect("command failure is not a hard failure");

    assert_eq!(output.artifact, OutputArtifact::new("ERROR", -1, -1));
    assert_eq!(
        output.disposition,
        Disposition::Failed {
            reason: "exit_code=1".to_string()
        }
    );
    assert!(processor.ledger().is_empty());
    assert_eq!(lister.calls(), 0, "failed commands are not verified");
    assert_eq!(
        fs::read_to_string(&checkpoint).unwrap_or_default(),
        "",
        "failed commands are never checkpointed"
    );

    let errors = fs::read_to_string(&error_log).expect("error log should exist");
    assert!(errors.contains("command=proc a.1234.dat -o a.1234.out"));
    assert!(errors.contains("exit_code=1"));
    assert!(errors.contains("cannot open a.1234.dat"));

    let events = fs::read_to_string(dir.join("events.log")).expect("event log should exist");
    assert!(events.contains("start: proc a.1234.dat -o a.1234.out"));
    assert!(!events.contains("failure:"), "failures go to the error log");

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn failed_command_is_retried_on_the_next_item() {
    let executor = FakeExecutor::exiting(1, "", "");
    let lister = FakeLister::with_files(Vec::new());
    let mut processor = processor(scenario_config(), &executor, &lister);
    let item = WorkItem::new("a.1234.dat", 1, 1);

    processor.process(&item, &[]).await.expect("first");
    processor.process(&item, &[]).await.expect("second");

    assert_eq!(executor.calls(), 2);
}

#[tokio::test]
async fn executor_errors_become_failures_with_their_reason() {
    let dir = temp_dir("processor-timeout");
    let executor = FakeExecutor::new(|_| {
        Err(ExecError::TimedOut {
            timeout_seconds: 5,
            cleanup: CleanupReport::ProcessGroup {
                pgid: 4242,
                delivered: true,
            },
        })
    });
    let lister = FakeLister::with_files(Vec::new());
    let mut processor = processor(
        ProcessorConfig {
            log_path: Some(dir.join("events.xml")),
            log_format: LogFormat::Xml,
            timeout_seconds: 5,
            force_cleanup: true,
            ..scenario_config()
        },
        &executor,
        &lister,
    );

    let output = processor
        .process(&WorkItem::new("slow.dat", 1, 1), &[])
        .await
        .expect("timeout is not a hard failure");

    assert_eq!(
        output.disposition,
        Disposition::Failed {
            reason: "timeout".to_string()
        }
    );
    assert!(processor.ledger().is_empty());

    let log = fs::read_to_string(dir.join("events.xml")).expect("log should exist");
    let failure = log
        .lines()
        .find(|line| line.contains("<header>failure</header>"))
        .expect("failure record falls back to the main log");
    assert!(failure.starts_with("<entry><time>"));
    assert!(failure.contains("command=proc slow.dat -o slow.out"));
    assert!(failure.contains("reason=timeout"));

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn missing_output_after_success_is_an_error_but_stays_checkpointed() {
    let executor = FakeExecutor::exiting(0, "", "");
    let lister = FakeLister::with_files(vec![file("other.out", 1, 1)]);
    let mut processor = processor(scenario_config(), &executor, &lister);

    let output = processor
        .process(&WorkItem::new("a.1234.dat", 1, 1), &[])
        .await
        .expect("verification failure is not a hard failure");

    assert_eq!(output.artifact, OutputArtifact::new("ERROR", -1, -1));
    assert_eq!(
        output.disposition,
        Disposition::Failed {
            reason: "output_not_found".to_string()
        }
    );
    assert!(processor.ledger().exists("proc a.1234.dat -o a.1234.out"));
}

#[tokio::test]
async fn listing_failure_is_recovered() {
    let executor = FakeExecutor::exiting(0, "", "");
    let lister = FakeLister::failing(ListError::new(ListErrorKind::Unreachable, "no route to host"));
    let mut processor = processor(scenario_config(), &executor, &lister);

    let output = processor
        .process(&WorkItem::new("a.1234.dat", 1, 1), &[])
        .await
        .expect("listing failure is not a hard failure");

    assert!(output.is_error());
    assert_eq!(
        output.disposition,
        Disposition::Failed {
            reason: "output_listing_failed".to_string()
        }
    );
}

#[tokio::test]
async fn custom_error_token_names_the_sentinel() {
    let executor = FakeExecutor::exiting(3, "", "");
    let lister = FakeLister::with_files(Vec::new());
    let mut processor = processor(
        ProcessorConfig {
            error_token: "__failed__".to_string(),
            ..scenario_config()
        },
        &executor,
        &lister,
    );

    let output = processor
        .process(&WorkItem::new("a.dat", 1, 1), &[])
        .await
        .expect("process");
    assert_eq!(output.artifact, OutputArtifact::new("__failed__", -1, -1));

    let passed = processor
        .process(&WorkItem::new("__failed__", -1, -1), &[])
        .await
        .expect("process");
    assert_eq!(passed.disposition, Disposition::PassThrough);
    assert_eq!(executor.calls(), 1);
}

#[tokio::test]
async fn unwritable_event_log_is_a_hard_failure() {
    let dir = temp_dir("processor-bad-log");
    let executor = FakeExecutor::exiting(0, "", "");
    let lister = FakeLister::with_files(Vec::new());

    let result = FileProcessor::initialize(
        ProcessorConfig {
            log_path: Some(dir.clone()),
            ..scenario_config()
        },
        executor.clone(),
        lister.clone(),
    );
    let err = result.err().expect("a directory cannot be appended to");
    assert_eq!(err.kind, ProcessorErrorKind::EventLog);

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn unreadable_checkpoint_is_a_hard_failure() {
    let dir = temp_dir("processor-bad-checkpoint");
    let executor = FakeExecutor::exiting(0, "", "");
    let lister = FakeLister::with_files(Vec::new());

    let result = FileProcessor::initialize(
        ProcessorConfig {
            checkpoint_path: Some(dir.clone()),
            ..scenario_config()
        },
        executor.clone(),
        lister.clone(),
    );
    let err = result.err().expect("a directory is not a checkpoint file");
    assert_eq!(err.kind, ProcessorErrorKind::Ledger);

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn invalid_host_is_rejected_at_initialize() {
    let executor = FakeExecutor::exiting(0, "", "");
    let lister = FakeLister::with_files(Vec::new());

    let result = FileProcessor::initialize(
        ProcessorConfig {
            host: "ops@cluster:notaport".to_string(),
            ..scenario_config()
        },
        executor.clone(),
        lister.clone(),
    );
    let err = result.err().expect("bad port must fail");
    assert_eq!(err.kind, ProcessorErrorKind::InvalidConfig);
    assert!(err.message.contains("processor.host"));
}

#[tokio::test]
async fn multi_line_stderr_stays_one_error_record() {
    let dir = temp_dir("processor-multiline-stderr");
    let error_log = dir.join("errors.log");
    let executor = FakeExecutor::exiting(1, "", "line one\nline two\r\nline three\n");
    let lister = FakeLister::with_files(Vec::new());
    let mut processor = processor(
        ProcessorConfig {
            error_log_path: Some(error_log.clone()),
            ..scenario_config()
        },
        &executor,
        &lister,
    );

    processor
        .process(&WorkItem::new("a.dat", 1, 1), &[])
        .await
        .expect("command failure is not a hard failure");

    let errors = fs::read_to_string(&error_log).expect("error log should exist");
    let lines: Vec<&str> = errors.lines().collect();
    assert_eq!(lines.len(), 1, "one failure is one record: {errors:?}");
    assert!(lines[0].contains("failure: command=proc a.dat -o a.out exit_code=1"));
    assert!(lines[0].ends_with("stderr=line one line two line three"));

    let _ = fs::remove_dir_all(&dir);
}
