use std::sync::Arc;

use crate::{
    checkpoint::CheckpointLedger,
    event_log::EventLog,
    exec::{CommandExecutor, ExecRequest, HostSpec},
    processor::{
        error::{ProcessorError, event_log_error, invalid_config},
        types::{ProcessorConfig, ProcessorSummary},
    },
    provenance::parse_provenance,
    template::{RenderContext, output_file_name, render},
    types::{Disposition, OutputArtifact, ProcessOutput, SubstitutionPair, WorkItem},
    verify::{DirectoryLister, OutputVerifier, VerifyOutcome},
};

/// Runs one rendered command per work item, at most once per distinct command line.
///
/// Each `process` call walks the item through pass-through check, rendering, the
/// checkpoint lookup, execution and output verification. Recoverable failures become
/// error-sentinel artifacts; only ledger and event-log I/O failures are returned as `Err`.
pub struct FileProcessor {
    config: ProcessorConfig,
    host: HostSpec,
    third_party: Option<HostSpec>,
    ledger: CheckpointLedger,
    event_log: EventLog,
    executor: Arc<dyn CommandExecutor>,
    verifier: OutputVerifier,
    summary: ProcessorSummary,
}

impl FileProcessor {
    pub fn initialize(
        config: ProcessorConfig,
        executor: Arc<dyn CommandExecutor>,
        lister: Arc<dyn DirectoryLister>,
    ) -> Result<Self, ProcessorError> {
        let host = HostSpec::parse(&config.host)
            .map_err(|err| invalid_config(format!("processor.host: {err}")))?;
        let third_party = match config
            .third_party_host
            .as_deref()
            .map(str::trim)
            .filter(|spec| !spec.is_empty())
        {
            Some(spec) => Some(
                HostSpec::parse(spec)
                    .map_err(|err| invalid_config(format!("processor.third_party_host: {err}")))?,
            ),
            None => None,
        };

        let ledger = match &config.checkpoint_path {
            Some(path) => CheckpointLedger::open(path.clone())?,
            None => CheckpointLedger::in_memory(),
        };
        let event_log = EventLog::new(
            config.log_path.clone(),
            config.error_log_path.clone(),
            config.log_format,
        );

        let processor = Self {
            config,
            host,
            third_party,
            ledger,
            event_log,
            executor,
            verifier: OutputVerifier::new(lister),
            summary: ProcessorSummary::default(),
        };

        processor.log_event(
            "initialize",
            &format!(
                "host={} template={} checkpoint_entries={}",
                processor.host,
                processor.config.command_template,
                processor.ledger.len()
            ),
        )?;
        tracing::info!(
            target: "processor",
            host = %processor.host,
            third_party = ?processor.third_party.as_ref().map(ToString::to_string),
            checkpoint_path = ?processor.ledger.path(),
            checkpoint_entries = processor.ledger.len(),
            check_output = processor.config.check_output,
            do_processing = processor.config.do_processing,
            timeout_seconds = processor.config.timeout_seconds,
            force_cleanup = processor.config.force_cleanup,
            "processor_initialized"
        );

        Ok(processor)
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn ledger(&self) -> &CheckpointLedger {
        &self.ledger
    }

    pub fn summary(&self) -> ProcessorSummary {
        self.summary
    }

    pub async fn process(
        &mut self,
        item: &WorkItem,
        substitutions: &[SubstitutionPair],
    ) -> Result<ProcessOutput, ProcessorError> {
        self.summary.processed += 1;

        if self.is_pass_through(item) {
            self.summary.passed_through += 1;
            tracing::debug!(
                target: "processor",
                item = %item.name,
                do_processing = self.config.do_processing,
                "item_passed_through"
            );
            return Ok(ProcessOutput {
                artifact: OutputArtifact::from_item(item),
                provenance: Vec::new(),
                disposition: Disposition::PassThrough,
            });
        }

        let out_file = output_file_name(
            &item.name,
            self.config.replace_extension,
            &self.config.new_extension,
        );
        let command = render(
            &self.config.command_template,
            &RenderContext {
                in_file: &item.name,
                out_file: &out_file,
                in_path: &self.config.input_dir,
                out_path: &self.config.output_dir,
                host: &self.config.host,
            },
            substitutions,
        );

        if self.ledger.exists(&command) {
            self.log_event("skip", &command)?;
            tracing::info!(target: "processor", item = %item.name, command = %command, "command_skipped");
            return match self.resolve_output(item, &out_file).await? {
                Ok(artifact) => {
                    self.summary.skipped += 1;
                    Ok(ProcessOutput {
                        artifact,
                        provenance: Vec::new(),
                        disposition: Disposition::Skipped,
                    })
                }
                Err(reason) => Ok(self.failed(reason)),
            };
        }

        self.log_event("start", &command)?;
        tracing::info!(target: "processor", item = %item.name, command = %command, "command_started");

        let request = ExecRequest {
            command: command.clone(),
            host: self.host.clone(),
            timeout_seconds: self.config.timeout_seconds,
            force_cleanup: self.config.force_cleanup,
            third_party: self.third_party.clone(),
        };
        let result = match self.executor.execute(&request).await {
            Ok(result) => result,
            Err(err) => {
                self.log_error(
                    "failure",
                    &format!("command={command} error={err} reason={}", err.reason_code()),
                )?;
                tracing::warn!(
                    target: "processor",
                    item = %item.name,
                    command = %command,
                    reason = err.reason_code(),
                    error = %err,
                    "command_failed"
                );
                return Ok(self.failed(err.reason_code().to_string()));
            }
        };

        if !result.succeeded() {
            let stderr = result.stderr_text();
            self.log_error(
                "failure",
                &format!(
                    "command={command} exit_code={} stderr={}",
                    result.exit_code,
                    stderr.trim()
                ),
            )?;
            tracing::warn!(
                target: "processor",
                item = %item.name,
                command = %command,
                exit_code = result.exit_code,
                "command_failed"
            );
            return Ok(self.failed(format!("exit_code={}", result.exit_code)));
        }

        self.ledger.record(&command)?;
        self.log_event("success", &command)?;
        tracing::info!(target: "processor", item = %item.name, command = %command, "command_succeeded");

        let provenance = parse_provenance(&result.stdout_text());
        match self.resolve_output(item, &out_file).await? {
            Ok(artifact) => {
                self.summary.executed += 1;
                Ok(ProcessOutput {
                    artifact,
                    provenance,
                    disposition: Disposition::Executed,
                })
            }
            Err(reason) => Ok(self.failed(reason)),
        }
    }

    pub fn shutdown(self) -> Result<ProcessorSummary, ProcessorError> {
        let summary = self.summary;
        self.log_event(
            "wrapup",
            &format!(
                "processed={} passed_through={} skipped={} executed={} failed={}",
                summary.processed,
                summary.passed_through,
                summary.skipped,
                summary.executed,
                summary.failed
            ),
        )?;
        tracing::info!(
            target: "processor",
            processed = summary.processed,
            passed_through = summary.passed_through,
            skipped = summary.skipped,
            executed = summary.executed,
            failed = summary.failed,
            "processor_shutdown"
        );
        Ok(summary)
    }

    fn is_pass_through(&self, item: &WorkItem) -> bool {
        !self.config.do_processing
            || item.name == self.config.stop_token
            || item.name == self.config.error_token
    }

    /// The inner `Err` carries the failure reason for a missing or unlistable output.
    async fn resolve_output(
        &self,
        item: &WorkItem,
        out_file: &str,
    ) -> Result<Result<OutputArtifact, String>, ProcessorError> {
        if !self.config.check_output {
            return Ok(Ok(OutputArtifact::new(out_file, item.size, item.date)));
        }

        let location = format!("{}:{}/{}", self.host, self.config.output_dir, out_file);
        match self
            .verifier
            .verify(out_file, &self.host, &self.config.output_dir)
            .await
        {
            VerifyOutcome::Found(artifact) => {
                self.log_event(
                    "verify",
                    &format!("{location} size={} date={}", artifact.size, artifact.date),
                )?;
                Ok(Ok(artifact))
            }
            VerifyOutcome::Ambiguous { chosen, candidates } => {
                self.log_event(
                    "verify_ambiguous",
                    &format!(
                        "{location} matched {} files ({}), using {}",
                        candidates.len(),
                        candidates.join(", "),
                        chosen.name
                    ),
                )?;
                Ok(Ok(chosen))
            }
            VerifyOutcome::NotFound => {
                self.log_error("verify_not_found", &location)?;
                Ok(Err("output_not_found".to_string()))
            }
            VerifyOutcome::ListingFailed(err) => {
                self.log_error("verify_failed", &format!("{location} error={err}"))?;
                Ok(Err("output_listing_failed".to_string()))
            }
        }
    }

    fn failed(&mut self, reason: String) -> ProcessOutput {
        self.summary.failed += 1;
        ProcessOutput {
            artifact: OutputArtifact::error_sentinel(&self.config.error_token),
            provenance: Vec::new(),
            disposition: Disposition::Failed { reason },
        }
    }

    fn log_event(&self, header: &str, message: &str) -> Result<(), ProcessorError> {
        self.event_log
            .event(header, message)
            .map_err(|err| event_log_error(format!("failed to write '{header}' record: {err}")))
    }

    fn log_error(&self, header: &str, message: &str) -> Result<(), ProcessorError> {
        self.event_log
            .error(header, message)
            .map_err(|err| event_log_error(format!("failed to write '{header}' error record: {err}")))
    }
}
