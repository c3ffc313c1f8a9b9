// =============================================================================
// source.rs - WHERE THE RAW BLOCKS COME FROM
// =============================================================================
//
// Logging into the league site and walking the rendered DOM is somebody
// else's job. By the time we get involved, the visible text of every element
// on the pending-transactions page has been dumped, in page order, as a JSON
// array of strings. We read that and hand it on untouched.
//
// Order matters: the deadline is first-match-wins, so blocks must come out in
// exactly the order they went in.
// =============================================================================

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::SourceError;

/// Something that yields one run's raw text blocks.
pub trait BlockSource: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn fetch_blocks(&self) -> Result<Vec<String>, SourceError>;
}

/// Reads a capture file holding a JSON array of strings.
#[derive(Debug, Clone)]
pub struct CaptureFileSource {
    path: PathBuf,
}

impl CaptureFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockSource for CaptureFileSource {
    fn name(&self) -> &str {
        "capture_file"
    }

    fn fetch_blocks(&self) -> Result<Vec<String>, SourceError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| SourceError::Read {
            path: self.path.clone(),
            source,
        })?;

        let blocks: Vec<String> =
            serde_json::from_str(&raw).map_err(|source| SourceError::Decode {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), blocks = blocks.len(), "Capture file loaded");
        Ok(blocks)
    }
}
