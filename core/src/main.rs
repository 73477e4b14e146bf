use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use fileproc::{
    cli::{CliOptions, options_from_args},
    config::Config,
    core_loop::{open_input, run_driver},
    exec::{CommandExecutor, HostExecutor, LocalExecutor, SessionPool, SshExecutor},
    logging::init_tracing,
    processor::FileProcessor,
    verify::{DirectoryLister, HostLister, RemoteLister},
};

#[tokio::main]
async fn main() -> Result<()> {
    let options = options_from_args()?;
    let config = Config::load(&options.config_path)
        .with_context(|| format!("failed to load config from {}", options.config_path.display()))?;
    let logging_guard = init_tracing(&config.logging)?;

    run(options, config).instrument(logging_guard.run_span()).await
}

async fn run(options: CliOptions, config: Config) -> Result<()> {
    let shutdown = CancellationToken::new();
    let pool = Arc::new(SessionPool::new(config.ssh.clone()));
    let executor: Arc<dyn CommandExecutor> = Arc::new(HostExecutor::new(
        LocalExecutor::with_cancellation(shutdown.clone()),
        SshExecutor::with_cancellation(Arc::clone(&pool), shutdown.clone()),
    ));
    let lister: Arc<dyn DirectoryLister> = Arc::new(HostLister::new(RemoteLister::new(
        Arc::clone(&executor),
        config.ssh.connect_timeout_seconds.saturating_mul(2),
    )));

    let mut processor = FileProcessor::initialize(config.processor.clone(), executor, lister)
        .context("failed to initialize file processor")?;

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;
    let signal_watch = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let signal_name = tokio::select! {
                _ = sigint.recv() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
                _ = shutdown.cancelled() => return,
            };
            tracing::warn!(target: "core_loop", signal = signal_name, "shutdown_signal_received");
            shutdown.cancel();
        })
    };

    let input = open_input(options.input_path.as_deref()).await?;
    let mut stdout = tokio::io::stdout();
    let driver_result = run_driver(&mut processor, input, &mut stdout, &shutdown).await;

    shutdown.cancel();
    let _ = signal_watch.await;

    let summary = processor.shutdown();
    pool.close_all().await;

    let report = driver_result?;
    let summary = summary.context("failed to shut down file processor")?;
    tracing::info!(
        target: "core_loop",
        exit_reason = ?report.exit_reason,
        requests = report.requests,
        processed = summary.processed,
        failed = summary.failed,
        "fileproc_stopped"
    );

    Ok(())
}
