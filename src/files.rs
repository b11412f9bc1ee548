//! # Lectura y escritura de archivos fuente
//!
//! Reads target files as text and writes them back atomically: the new content
//! is staged in a temporary file next to the target and only renamed over it
//! once fully written. Dropping a staged write without committing it removes
//! the temporary file and leaves the target untouched.

use crate::error::{FixError, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Reads the whole file as UTF-8.
///
/// A missing path maps to `FileNotFound`; anything else (permissions,
/// invalid UTF-8, a directory) to `ReadFailure`.
pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => FixError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => FixError::ReadFailure {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Content staged for `target` but not yet visible there.
pub struct StagedWrite {
    target: PathBuf,
    staged: NamedTempFile,
}

impl StagedWrite {
    pub fn new(target: &Path) -> Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staged = tempfile::Builder::new()
            .prefix(".sentinel-fix-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|source| write_failure(target, source))?;

        Ok(Self {
            target: target.to_path_buf(),
            staged,
        })
    }

    pub fn write(&mut self, contents: &str) -> Result<()> {
        self.staged
            .write_all(contents.as_bytes())
            .and_then(|_| self.staged.flush())
            .map_err(|source| write_failure(&self.target, source))
    }

    #[cfg(test)]
    fn staged_path(&self) -> &Path {
        self.staged.path()
    }

    /// Replaces the target in one rename, keeping its permissions.
    pub fn commit(self) -> Result<()> {
        let Self { target, staged } = self;

        staged
            .as_file()
            .sync_all()
            .map_err(|source| write_failure(&target, source))?;

        if let Ok(metadata) = fs::metadata(&target) {
            fs::set_permissions(staged.path(), metadata.permissions())
                .map_err(|source| write_failure(&target, source))?;
        }

        staged
            .persist(&target)
            .map_err(|e| write_failure(&target, e.error))?;
        Ok(())
    }
}

pub fn write_atomic(target: &Path, contents: &str) -> Result<()> {
    let mut staged = StagedWrite::new(target)?;
    staged.write(contents)?;
    staged.commit()
}

fn write_failure(path: &Path, source: io::Error) -> FixError {
    FixError::WriteFailure {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_read_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = read_source(&tmp.path().join("nope.rs")).unwrap_err();
        assert!(matches!(err, FixError::FileNotFound { .. }));
    }

    #[test]
    fn test_read_directory_is_a_read_failure() {
        let tmp = TempDir::new().unwrap();
        let err = read_source(tmp.path()).unwrap_err();
        assert!(matches!(err, FixError::ReadFailure { .. }));
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("lib.rs");
        fs::write(&target, "old").unwrap();

        write_atomic(&target, "new").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        assert_eq!(entries(tmp.path()), vec!["lib.rs".to_string()]);
    }

    #[test]
    fn test_interrupted_write_keeps_original() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("lib.rs");
        fs::write(&target, "fn original() {}\n").unwrap();

        {
            let mut staged = StagedWrite::new(&target).unwrap();
            staged.write("fn half_writ").unwrap();
            assert!(staged.staged_path().exists());
            // dropped before commit
        }

        assert_eq!(fs::read_to_string(&target).unwrap(), "fn original() {}\n");
        assert_eq!(entries(tmp.path()), vec!["lib.rs".to_string()]);
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("missing").join("lib.rs");
        let err = write_atomic(&target, "x").unwrap_err();
        assert!(matches!(err, FixError::WriteFailure { .. }));
        assert!(!target.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_commit_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("run.sh");
        fs::write(&target, "echo old\n").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o755)).unwrap();

        write_atomic(&target, "echo new\n").unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
