//! Moving the built artifact into its staged location.
//!
//! A plain rename is tried first. When that is not possible (different
//! filesystems) the bytes are copied into a temp file next to the
//! destination, persisted over it atomically, and only then is the source
//! removed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, StageError};

/// Create `dir` and any missing parents. Succeeds if it already exists.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| StageError::DirectoryCreateFailed {
        path: dir.to_path_buf(),
        source,
    })
}

/// Move `from` to `to`, replacing any file already at `to`.
pub fn move_artifact(from: &Path, to: &Path) -> Result<()> {
    let move_failed = |source: io::Error| StageError::MoveFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StageError::ArtifactMissing {
                path: from.to_path_buf(),
            })
        }
        Err(e) => debug!("rename failed ({e}), falling back to copy"),
    }

    copy_then_remove(from, to).map_err(move_failed)
}

fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let dest_dir = to
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut src = fs::File::open(from)?;
    let permissions = src.metadata()?.permissions();

    let mut tmp = NamedTempFile::new_in(&dest_dir)?;
    io::copy(&mut src, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    fs::set_permissions(tmp.path(), permissions)?;
    tmp.persist(to).map_err(|e| e.error)?;

    drop(src);
    fs::remove_file(from)
}

/// Hex SHA-256 of the file at `path`.
pub fn file_digest(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_dir_creates_parents_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("programs");

        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn ensure_dir_fails_when_path_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("programs");
        fs::write(&file, b"not a dir").unwrap();

        match ensure_dir(&file.join("inner")) {
            Err(StageError::DirectoryCreateFailed { path, .. }) => {
                assert_eq!(path, file.join("inner"))
            }
            other => panic!("expected DirectoryCreateFailed, got {other:?}"),
        }
    }

    #[test]
    fn move_replaces_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("built");
        let to = dir.path().join("staged");
        fs::write(&from, b"new").unwrap();
        fs::write(&to, b"old").unwrap();

        move_artifact(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"new");
    }

    #[test]
    fn move_of_missing_source_is_artifact_missing() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("nope");
        let to = dir.path().join("staged");

        assert!(matches!(
            move_artifact(&from, &to),
            Err(StageError::ArtifactMissing { .. })
        ));
        assert!(!to.exists());
    }

    #[test]
    fn copy_fallback_moves_bytes_and_removes_source() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("built");
        let to = dir.path().join("staged");
        fs::write(&from, b"binary").unwrap();

        copy_then_remove(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"binary");
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn copy_fallback_keeps_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("built");
        let to = dir.path().join("staged");
        fs::write(&from, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&from, fs::Permissions::from_mode(0o755)).unwrap();

        copy_then_remove(&from, &to).unwrap();

        let mode = fs::metadata(&to).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn digest_is_sha256_hex() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, b"").unwrap();
        assert_eq!(
            file_digest(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
