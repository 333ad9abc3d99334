//! Conversion error types.

use thiserror::Error;

use crate::archive::ArchiveError;

/// Errors that abort a conversion.
///
/// Deliberately small: per the degradation policy, only a structurally
/// unreadable archive or an explicit cancellation stops the pipeline.
/// Everything else continues and accumulates diagnostics on the package.
///
/// `Clone` because the conversion cache shares one failure among all
/// callers that were awaiting the same in-flight conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// The archive failed structural validation; nothing downstream can
    /// proceed.
    #[error("archive rejected: {0}")]
    Archive(#[from] ArchiveError),

    /// The conversion was cancelled at a stage boundary. Partial results
    /// are discarded, never published.
    #[error("conversion cancelled")]
    Cancelled,
}
