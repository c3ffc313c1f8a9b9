// =============================================================================
// error.rs - THINGS THAT CAN GO WRONG AT THE EDGES
// =============================================================================
//
// Extraction itself never errors: a block it can't read just yields nothing.
// Only the I/O on either side of it can fail.
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("could not read capture file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("capture file {path} is not a JSON array of strings: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode records: {0}")]
    Encode(#[from] serde_json::Error),
}
