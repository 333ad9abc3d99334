//! CLI subcommands.

pub mod convert;
pub mod info;

use std::fs;
use std::path::Path;

use skinforge::bytes::Bytes;

use crate::error::CliError;

/// Read an archive file into memory.
pub fn read_archive(path: &Path) -> Result<Bytes, CliError> {
    fs::read(path).map(Bytes::from).map_err(|source| CliError::ReadInput {
        path: path.to_path_buf(),
        source,
    })
}
