//! Error types for the provisioning pipeline.
//!
//! Integrity and extraction failures are fatal and carry enough detail to
//! diagnose a bad mirror or a stale manifest pin. Everything else (network,
//! disk) propagates as-is; recovery is simply re-running the pipeline.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, PrepError>;

#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    /// A freshly downloaded file does not hash to its manifest digest.
    #[error(
        "sha512 mismatch for '{artifact}' ({url})\n  expected: {expected}\n  got:      {actual}"
    )]
    Integrity {
        artifact: String,
        url: String,
        expected: String,
        actual: String,
    },

    /// Extraction finished but the expected source directory is missing.
    #[error(
        "extracting '{artifact}' did not produce expected directory {dir}\n  \
         (malformed archive, or the manifest's directory name is wrong)"
    )]
    Extraction { artifact: String, dir: PathBuf },

    /// An archive entry would escape the extraction destination.
    #[error("archive for '{artifact}' contains unsafe entry: {detail}")]
    UnsafeArchive { artifact: String, detail: String },

    #[error("cannot detect archive format of {0}")]
    UnknownFormat(PathBuf),

    #[error("download of {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
