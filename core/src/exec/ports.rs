use async_trait::async_trait;

use crate::{
    exec::{error::ExecError, host::HostSpec, local::LocalExecutor, ssh::SshExecutor},
    types::ExecutionResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub command: String,
    pub host: HostSpec,
    /// Zero waits indefinitely.
    pub timeout_seconds: u64,
    pub force_cleanup: bool,
    pub third_party: Option<HostSpec>,
}

impl ExecRequest {
    pub fn local(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            host: HostSpec::Local,
            timeout_seconds: 0,
            force_cleanup: false,
            third_party: None,
        }
    }
}

/// Runs one command to completion. A non-zero exit status is a successful `Ok` result;
/// only spawn/wait failures, timeouts and cancellation are errors.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, request: &ExecRequest) -> Result<ExecutionResult, ExecError>;
}

/// Routes each request to the local shell or to ssh depending on its host.
pub struct HostExecutor {
    local: LocalExecutor,
    remote: SshExecutor,
}

impl HostExecutor {
    pub fn new(local: LocalExecutor, remote: SshExecutor) -> Self {
        Self { local, remote }
    }
}

#[async_trait]
impl CommandExecutor for HostExecutor {
    async fn execute(&self, request: &ExecRequest) -> Result<ExecutionResult, ExecError> {
        match &request.host {
            HostSpec::Local => self.local.execute(request).await,
            HostSpec::Remote(_) => self.remote.execute(request).await,
        }
    }
}
