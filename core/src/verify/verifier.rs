use std::sync::Arc;

use crate::{
    exec::HostSpec,
    types::OutputArtifact,
    verify::{
        error::ListError,
        lister::{DirectoryLister, FileInfo},
        mask::FileMask,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Found(OutputArtifact),
    /// More than one file matched; `chosen` is the first in listing order.
    Ambiguous {
        chosen: OutputArtifact,
        candidates: Vec<String>,
    },
    NotFound,
    ListingFailed(ListError),
}

impl VerifyOutcome {
    pub fn artifact(&self) -> Option<&OutputArtifact> {
        match self {
            VerifyOutcome::Found(artifact) | VerifyOutcome::Ambiguous { chosen: artifact, .. } => {
                Some(artifact)
            }
            VerifyOutcome::NotFound | VerifyOutcome::ListingFailed(_) => None,
        }
    }

    pub fn into_artifact(self, error_token: &str) -> OutputArtifact {
        match self {
            VerifyOutcome::Found(artifact) | VerifyOutcome::Ambiguous { chosen: artifact, .. } => {
                artifact
            }
            VerifyOutcome::NotFound | VerifyOutcome::ListingFailed(_) => {
                OutputArtifact::error_sentinel(error_token)
            }
        }
    }
}

pub struct OutputVerifier {
    lister: Arc<dyn DirectoryLister>,
}

impl OutputVerifier {
    pub fn new(lister: Arc<dyn DirectoryLister>) -> Self {
        Self { lister }
    }

    pub async fn verify(&self, mask: &str, host: &HostSpec, dir: &str) -> VerifyOutcome {
        let mask = match FileMask::new(mask) {
            Ok(mask) => mask,
            Err(err) => return VerifyOutcome::ListingFailed(err),
        };

        let files = match self.lister.list(host, dir, &mask).await {
            Ok(files) => files,
            Err(err) => {
                tracing::warn!(
                    target: "verify",
                    host = %host,
                    dir = dir,
                    mask = mask.as_str(),
                    error = %err,
                    "output_listing_failed"
                );
                return VerifyOutcome::ListingFailed(err);
            }
        };

        match files.as_slice() {
            [] => {
                tracing::warn!(target: "verify", host = %host, dir = dir, mask = mask.as_str(), "output_not_found");
                VerifyOutcome::NotFound
            }
            [single] => VerifyOutcome::Found(to_artifact(single)),
            [first, ..] => {
                let candidates: Vec<String> = files.iter().map(|file| file.name.clone()).collect();
                tracing::warn!(
                    target: "verify",
                    host = %host,
                    dir = dir,
                    mask = mask.as_str(),
                    matches = candidates.len(),
                    chosen = %first.name,
                    "output_ambiguous"
                );
                VerifyOutcome::Ambiguous {
                    chosen: to_artifact(first),
                    candidates,
                }
            }
        }
    }
}

fn to_artifact(file: &FileInfo) -> OutputArtifact {
    OutputArtifact::new(file.name.clone(), file.size, file.date)
}
