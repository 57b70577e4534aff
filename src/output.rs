//! JSON output for the static site.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

/// Serializes `records` as a pretty-printed JSON array (2-space indent,
/// non-ASCII kept literal).
pub fn render_json<T: Serialize>(records: &[T]) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec_pretty(records)
}

/// Writes `content` to a temporary sibling of `dst` and renames it into
/// place, so readers never observe a half-written file.
///
/// Any existing file is overwritten. On error the destination is left
/// untouched.
pub fn write_atomic(dst: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    // Randomized temp name so a stale or hostile file at a predictable path can't be reused
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)?;

    let written = temp_file
        .write_all(content)
        .and_then(|()| temp_file.sync_all());
    drop(temp_file);
    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    // On Windows, rename fails if destination exists, so remove it first
    #[cfg(windows)]
    if dst.exists() {
        if let Err(e) = std::fs::remove_file(dst) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }
    }

    std::fs::rename(&temp_path, dst).inspect_err(|_| {
        let _ = std::fs::remove_file(&temp_path);
    })
}
