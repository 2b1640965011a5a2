use std::fs::File;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::trace;

use crate::error::{Error, Result};

/// An exclusive advisory lock over a file, taken by creating `<path>.lock`
/// with `create_new` semantics.
///
/// The guarded file is replaced only on [`commit`](LockedFile::commit):
/// new contents are written to the lock file and renamed into place. Dropping
/// the guard without committing removes the lock file and leaves the guarded
/// file untouched, so read-only critical sections (e.g. `commit` reading the
/// index) release cleanly.
pub struct LockedFile {
    guarded_path: Utf8PathBuf,
    lock_path: Utf8PathBuf,
    file: Option<File>,
    committed: bool,
}

impl LockedFile {
    pub fn acquire(path: &Utf8Path) -> Result<Self> {
        let lock_path = Utf8PathBuf::from(format!("{path}.lock"));

        match File::options().write(true).create_new(true).open(&lock_path) {
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(Error::IndexLocked),
            Err(e) => Err(e.into()),
            Ok(file) => {
                trace!(?lock_path, "Acquired lock");
                Ok(Self {
                    guarded_path: path.to_owned(),
                    lock_path,
                    file: Some(file),
                    committed: false,
                })
            }
        }
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.file
            .as_mut()
            .expect("file is only taken on commit")
            .write_all(bytes)?;
        Ok(())
    }

    /// Atomically replace the guarded file with what was written to the lock.
    pub fn commit(mut self) -> Result<()> {
        let mut file = self.file.take().expect("commit consumes the lock");
        file.flush()?;
        drop(file);
        std::fs::rename(&self.lock_path, &self.guarded_path)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        if !self.committed {
            self.file.take();
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn lock_is_exclusive() {
        let dir = TempDir::new("").unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("index");

        let lock = LockedFile::acquire(&path).unwrap();
        assert!(matches!(
            LockedFile::acquire(&path),
            Err(Error::IndexLocked)
        ));
        drop(lock);

        // Dropping without committing releases the lock.
        let _relocked = LockedFile::acquire(&path).unwrap();
    }

    #[test]
    fn commit_replaces_the_guarded_file() {
        let dir = TempDir::new("").unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("index");
        std::fs::write(&path, b"old").unwrap();

        let mut lock = LockedFile::acquire(&path).unwrap();
        lock.write(b"new contents").unwrap();
        lock.commit().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new contents");
        // And the lock is gone.
        let _relocked = LockedFile::acquire(&path).unwrap();
    }

    #[test]
    fn uncommitted_lock_leaves_file_alone() {
        let dir = TempDir::new("").unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("index");
        std::fs::write(&path, b"old").unwrap();

        let mut lock = LockedFile::acquire(&path).unwrap();
        lock.write(b"discarded").unwrap();
        drop(lock);

        assert_eq!(std::fs::read(&path).unwrap(), b"old");
    }
}
