//! Error types for the signing and export pipeline

use crate::SignerRole;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the signing and export pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// One or more required signer surfaces were blank at preview time.
    /// The display string is the user-facing gate message.
    #[error("请完成双方签名后再预览")]
    IncompleteSignatures { missing: Vec<SignerRole> },

    /// Requested document-type key has no registered template
    #[error("Unknown template key: {0}")]
    UnknownTemplate(String),

    /// A required surface is not mounted for the given role
    #[error("No surface mounted for {0:?}")]
    MissingMountPoint(SignerRole),

    /// Rasterizing the rendered preview failed
    #[error("Rasterization failed: {0}")]
    RasterizationFailure(String),

    /// Image encoding failed after a successful rasterization
    #[error("Image encoding failed: {0}")]
    EncodingFailure(String),

    /// Assembling the paginated document failed
    #[error("Document assembly failed: {0}")]
    AssemblyFailure(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Roles still missing a signature, when this is a gate failure.
    pub fn missing_signers(&self) -> &[SignerRole] {
        match self {
            Error::IncompleteSignatures { missing } => missing,
            _ => &[],
        }
    }
}
