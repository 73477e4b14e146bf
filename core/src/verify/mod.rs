pub mod error;
pub mod lister;
pub mod mask;
pub mod verifier;

pub use error::{ListError, ListErrorKind};
pub use lister::{DirectoryLister, FileInfo, HostLister, LocalLister, RemoteLister};
pub use mask::FileMask;
pub use verifier::{OutputVerifier, VerifyOutcome};
