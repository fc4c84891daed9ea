//! Checksum verification for completed downloads.
//!
//! Computed on demand after all blocks land, never inline with block
//! writes, and compared against the checksum carried by the file-info
//! record.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::Path;

/// SHA-256 of the file at `path` as lowercase hex.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)
        .with_context(|| format!("read {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

/// True if the file's SHA-256 matches `expected` (hex, case-insensitive).
pub fn matches_checksum(path: &Path, expected: &str) -> Result<bool> {
    let digest = sha256_file(path)?;
    Ok(digest.eq_ignore_ascii_case(expected.trim()))
}
