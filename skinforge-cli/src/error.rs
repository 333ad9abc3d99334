//! CLI error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to the terminal.
#[derive(Debug, Error)]
pub enum CliError {
    /// Failed to read the input archive.
    #[error("cannot read {path}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The conversion pipeline rejected the archive.
    #[error(transparent)]
    Convert(#[from] skinforge::ConvertError),

    /// Failed to write converted output.
    #[error("cannot write {path}: {message}")]
    WriteOutput { path: PathBuf, message: String },
}
