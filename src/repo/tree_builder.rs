use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::trace;

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::object::{Object, Tree, TreeEntry};

impl super::Repo {
    /// Convert the flat index into a hierarchy of tree objects, writing each
    /// tree to the database, and return the root tree's id.
    ///
    /// Directories are processed deepest-first (by path-string length), so a
    /// child tree's id is always known by the time its parent is serialized.
    /// An empty index still produces (and stores) an empty root tree.
    pub fn tree_from_index(&self, index: &Index) -> Result<Digest> {
        // Directory path -> entries collected for that directory so far.
        let mut pending: HashMap<Utf8PathBuf, Vec<TreeEntry>> = HashMap::new();
        pending.insert(Utf8PathBuf::new(), Vec::new());

        for entry in index.entries() {
            let path = Utf8Path::new(entry.name());
            let file_name = path
                .file_name()
                .ok_or(Error::CorruptIndex("entry name has no final component"))?;
            let parent = path.parent().unwrap_or_else(|| Utf8Path::new(""));

            // Register every ancestor directory down to the root, including
            // ones that contain no files of their own.
            let mut dir = parent;
            loop {
                pending.entry(dir.to_owned()).or_default();
                match dir.parent() {
                    Some(up) => dir = up,
                    None => break,
                }
            }

            pending
                .get_mut(parent)
                .expect("parent directory was just registered")
                .push(TreeEntry::file(
                    entry.mode(),
                    file_name.to_owned(),
                    entry.oid().clone(),
                ));
        }

        let mut dirs: Vec<Utf8PathBuf> = pending.keys().cloned().collect();
        dirs.sort_by(|a, b| b.as_str().len().cmp(&a.as_str().len()));

        let mut root = None;
        for dir in dirs {
            let entries = pending
                .remove(&dir)
                .expect("every directory is pending exactly once");
            let tree = Tree::new(entries);
            let oid = self.database.store(&Object::Tree(tree))?;
            trace!(%dir, oid = %oid.short(), "Stored tree");

            match dir.parent() {
                // Only the empty root path has no parent.
                None => root = Some(oid),
                Some(parent) => {
                    let name = dir
                        .file_name()
                        .expect("non-root directories have a final component");
                    pending
                        .get_mut(parent)
                        .expect("ancestor directories are always registered")
                        .push(TreeEntry::directory(name.to_owned(), oid));
                }
            }
        }

        Ok(root.expect("the root directory is always registered"))
    }
}
