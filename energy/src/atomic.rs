use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

/// Work-in-progress sibling of `path`, renamed over it once complete.
pub(crate) fn wip_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("__WIP__{name}"))
}

/// Writes `path` through a temporary file in the same directory.
///
/// `path` is only replaced after the content has been synced to disk.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let wip = wip_path(path);
    let mut file = File::create(&wip).map_err(|e| Error::io(&wip, e))?;
    let written = write(&mut file).and_then(|()| file.sync_all().map_err(|e| Error::io(&wip, e)));
    drop(file);
    if let Err(e) = written {
        if let Err(rm) = fs::remove_file(&wip) {
            tracing::warn!("Failed to remove {}: {rm}", wip.display());
        }
        return Err(e);
    }
    fs::rename(&wip, path).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_write_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perf.csv");
        fs::write(&path, "old").unwrap();

        write_atomically(&path, |file| {
            file.write_all(b"new").map_err(|e| Error::io("perf.csv", e))
        })
        .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert!(!wip_path(&path).exists());

        // A failed write leaves the original untouched
        let result = write_atomically(&path, |file| {
            file.write_all(b"partial").unwrap();
            Err(Error::parse("perf.csv", "boom"))
        });
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert!(!wip_path(&path).exists());
    }
}
