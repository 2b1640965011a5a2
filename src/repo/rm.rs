use camino::Utf8PathBuf;
use tracing::trace;

use crate::error::{Error, Result};
use crate::lock::LockedFile;

impl super::Repo {
    /// Unstage paths, and (unless `keep_files`) delete them from the
    /// worktree.
    ///
    /// Every argument must name a tracked path unless `skip_missing` is set;
    /// arguments outside the worktree are always an error. The index is
    /// rewritten under its lock.
    pub fn rm(
        &mut self,
        paths: &[Utf8PathBuf],
        keep_files: bool,
        skip_missing: bool,
    ) -> Result<()> {
        let mut lock = LockedFile::acquire(&self.index_path())?;
        let mut index = self.read_index()?;

        let mut removed = Vec::new();
        for path in paths {
            let relative = self.worktree_relative(path)?;

            if index.remove_entry(relative.as_str()) {
                trace!(?relative, "Removed path from index");
                removed.push(relative);
            } else if !skip_missing {
                return Err(Error::NotInIndex(relative));
            }
        }

        lock.write(&index.serialize())?;
        lock.commit()?;

        if !keep_files {
            for relative in removed {
                let absolute = self.worktree.join(relative);
                match std::fs::remove_file(&absolute) {
                    Ok(()) => trace!(?absolute, "Deleted working-tree file"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Ok(())
    }
}
