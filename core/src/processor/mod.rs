pub mod error;
pub mod runtime;
pub mod types;

pub use error::{ProcessorError, ProcessorErrorKind};
pub use runtime::FileProcessor;
pub use types::{ProcessorConfig, ProcessorSummary};
