//! Atomic artifact writes
//!
//! Every artifact is first written to a hidden temporary file next to its
//! destination and then renamed over it, so a failed run never leaves a
//! half-written file at the final path.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{RiskError, RiskResult};

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> RiskResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| RiskError::io(parent, e))?;
        }
    }
    Ok(())
}

/// Sibling temporary path used while `path` is being written.
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("artifact");
    path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()))
}

/// Write an artifact through `write`, then atomically move it into place.
///
/// The temporary file is removed if `write` fails.
pub fn write_atomic_with<F>(path: &Path, write: F) -> RiskResult<()>
where
    F: FnOnce(&mut File) -> RiskResult<()>,
{
    ensure_parent_dir(path)?;
    let temp_path = temp_path_for(path);

    let result = File::create(&temp_path)
        .map_err(|e| RiskError::io(&temp_path, e))
        .and_then(|mut file| {
            write(&mut file)?;
            file.sync_all().map_err(|e| RiskError::io(&temp_path, e))
        });

    if let Err(e) = result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        RiskError::io(path, e)
    })
}

/// Write a byte buffer atomically.
pub fn write_atomic(path: &Path, data: &[u8]) -> RiskResult<()> {
    write_atomic_with(path, |file| {
        file.write_all(data).map_err(|e| RiskError::io(path, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parent_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("model.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_failed_write_leaves_no_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preprocessor.json");

        let result = write_atomic_with(&path, |_| Err(RiskError::Fit("boom".to_string())));

        assert!(result.is_err());
        assert!(!path.exists());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "temporary file should be cleaned up");
    }

    #[test]
    fn test_failed_write_keeps_previous_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        write_atomic(&path, b"good").unwrap();

        let _ = write_atomic_with(&path, |_| Err(RiskError::Fit("boom".to_string())));

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "good");
    }
}
