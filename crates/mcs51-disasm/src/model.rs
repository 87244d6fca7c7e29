use anyhow::{Context, Result};
use std::path::Path;

use mcs51_rs::Rom;

/// Reads a raw ROM dump, dropping `skip` leading bytes and keeping at most
/// `len` bytes after that.
pub fn load_raw_bin(path: &Path, skip: usize, len: Option<usize>) -> Result<Rom> {
    let file = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    anyhow::ensure!(skip <= file.len(), "--skip exceeds file size");
    let mut payload = &file[skip..];
    if let Some(lim) = len {
        anyhow::ensure!(lim <= payload.len(), "--len exceeds remaining file size after skip");
        payload = &payload[..lim];
    }
    Ok(Rom::new(payload.to_vec())?)
}
