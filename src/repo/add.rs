use std::ffi::CString;
use std::mem::MaybeUninit;
use std::os::unix::prelude::OsStrExt;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::trace;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::index::IndexEntry;
use crate::lock::LockedFile;
use crate::object::{Blob, Object};

use super::GIT_DIR;

impl super::Repo {
    /// Stage paths: hash each file into the object database and record it in
    /// the index. Directory arguments are walked recursively; `.` stages the
    /// whole worktree. The index is rewritten under its lock.
    pub fn add(&mut self, paths: &[Utf8PathBuf]) -> Result<()> {
        let mut lock = LockedFile::acquire(&self.index_path())?;
        let mut index = self.read_index()?;

        for path in paths {
            trace!(?path, "Adding path to index");
            let relative = self.worktree_relative(path)?;
            let absolute = self.worktree.join(&relative);
            if !absolute.exists() {
                return Err(Error::NotAFile(path.clone()));
            }

            for file in self.list_files(&absolute)? {
                let relative = file
                    .strip_prefix(&self.worktree)
                    .expect("listed files are under the worktree")
                    .to_owned();
                trace!(?relative, "Adding file");

                let stat = stat_file(&file)?;
                if stat.st_mode & libc::S_IFMT != libc::S_IFREG
                    && stat.st_mode & libc::S_IFMT != libc::S_IFLNK
                {
                    return Err(Error::NotAFile(file));
                }

                let data = if stat.st_mode & libc::S_IFMT == libc::S_IFLNK {
                    link_target(&file)?
                } else {
                    std::fs::read(&file)?
                };

                let oid = self.database.store(&Object::Blob(Blob::new(data)))?;
                index.add_entry(IndexEntry::from_stat(relative.into_string(), oid, &stat));
            }
        }

        lock.write(&index.serialize())?;
        lock.commit()?;

        Ok(())
    }

    /// All regular files (and symlinks) under `path`, skipping the
    /// repository directory itself. A file argument lists just itself.
    fn list_files(&self, path: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
        if !path.is_dir() || path.is_symlink() {
            return Ok(vec![path.to_owned()]);
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(path) {
            let entry = entry.map_err(|e| -> std::io::Error {
                e.into_io_error()
                    .unwrap_or_else(|| std::io::ErrorKind::Other.into())
            })?;
            let entry_path = Utf8Path::from_path(entry.path())
                .ok_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("path is not valid UTF-8: {}", entry.path().display()),
                    )
                })?
                .to_owned();

            if entry_path
                .components()
                .any(|c| c.as_str() == GIT_DIR)
            {
                continue;
            }
            if entry.file_type().is_dir() {
                continue;
            }
            entries.push(entry_path);
        }
        Ok(entries)
    }
}

/// `lstat` a path, so symlinks are described rather than followed.
pub(super) fn stat_file(path: &Utf8Path) -> Result<libc::stat> {
    // Safety: lstat writes its result through the second pointer and never
    // reads from it.
    unsafe {
        let mut dest: MaybeUninit<libc::stat> = MaybeUninit::uninit();
        let cpath = CString::new(path.as_os_str().as_bytes()).expect("paths contain no NUL");
        match libc::lstat(cpath.as_ptr(), dest.as_mut_ptr()) {
            0 => Ok(dest.assume_init()),
            _ => Err(std::io::Error::last_os_error().into()),
        }
    }
}

/// A symlink's blob content is its target path, as bytes.
fn link_target(path: &Utf8Path) -> Result<Vec<u8>> {
    let target = std::fs::read_link(path)?;
    Ok(target.as_os_str().as_bytes().to_vec())
}
