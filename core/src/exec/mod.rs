pub mod error;
pub mod host;
pub mod local;
pub mod pool;
pub mod ports;
pub mod process;
pub mod ssh;

pub use error::{CleanupReport, ExecError};
pub use host::{HostSpec, RemoteTarget};
pub use local::LocalExecutor;
pub use pool::{SessionPool, SshConfig, SshSession};
pub use ports::{CommandExecutor, ExecRequest, HostExecutor};
pub use ssh::SshExecutor;
