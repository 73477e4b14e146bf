use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use fileproc::{
    exec::{CommandExecutor, ExecError, ExecRequest, HostSpec},
    processor::{FileProcessor, ProcessorConfig},
    types::ExecutionResult,
    verify::{DirectoryLister, FileInfo, FileMask, ListError},
};
use uuid::Uuid;

type Responder = Box<dyn Fn(&ExecRequest) -> Result<ExecutionResult, ExecError> + Send + Sync>;

pub struct FakeExecutor {
    responder: Responder,
    calls: AtomicUsize,
    requests: Mutex<Vec<ExecRequest>>,
}

impl FakeExecutor {
    pub fn new(
        responder: impl Fn(&ExecRequest) -> Result<ExecutionResult, ExecError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn exiting(exit_code: i32, stdout: &str, stderr: &str) -> Arc<Self> {
        let result = ExecutionResult {
            exit_code,
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        };
        Self::new(move |_| Ok(result.clone()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("lock")
            .iter()
            .map(|request| request.command.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<ExecRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CommandExecutor for FakeExecutor {
    async fn execute(&self, request: &ExecRequest) -> Result<ExecutionResult, ExecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("lock").push(request.clone());
        (self.responder)(request)
    }
}

pub struct FakeLister {
    files: Mutex<Vec<FileInfo>>,
    failure: Option<ListError>,
    calls: AtomicUsize,
    listed: Mutex<Vec<(String, String, String)>>,
}

impl FakeLister {
    pub fn with_files(files: Vec<FileInfo>) -> Arc<Self> {
        Arc::new(Self {
            files: Mutex::new(files),
            failure: None,
            calls: AtomicUsize::new(0),
            listed: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: ListError) -> Arc<Self> {
        Arc::new(Self {
            files: Mutex::new(Vec::new()),
            failure: Some(error),
            calls: AtomicUsize::new(0),
            listed: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(host, dir, mask)` for every listing request.
    pub fn listed(&self) -> Vec<(String, String, String)> {
        self.listed.lock().expect("lock").clone()
    }
}

#[async_trait]
impl DirectoryLister for FakeLister {
    async fn list(&self, host: &HostSpec, dir: &str, mask: &FileMask) -> Result<Vec<FileInfo>, ListError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.listed.lock().expect("lock").push((
            host.to_string(),
            dir.to_string(),
            mask.as_str().to_string(),
        ));
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let mut files: Vec<FileInfo> = self
            .files
            .lock()
            .expect("lock")
            .iter()
            .filter(|file| mask.matches(&file.name))
            .cloned()
            .collect();
        files.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name));
        Ok(files)
    }
}

pub fn file(name: &str, size: i64, date: i64) -> FileInfo {
    FileInfo {
        name: name.to_string(),
        size,
        date,
    }
}

pub fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fileproc-{label}-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&dir).expect("temp dir should be created");
    dir
}

pub fn scenario_config() -> ProcessorConfig {
    ProcessorConfig {
        command_template: "proc _INFILE_ -o _OUTFILE_".to_string(),
        output_dir: "/data/out".to_string(),
        replace_extension: true,
        new_extension: "out".to_string(),
        ..ProcessorConfig::default()
    }
}

pub fn processor(
    config: ProcessorConfig,
    executor: &Arc<FakeExecutor>,
    lister: &Arc<FakeLister>,
) -> FileProcessor {
    FileProcessor::initialize(config, executor.clone(), lister.clone())
        .expect("processor should initialize")
}
