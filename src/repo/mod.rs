mod add;
pub mod refs;
mod rm;
mod tree_builder;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use tracing::*;

use crate::database::Database;
use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::lock::LockedFile;
use crate::object::commit::Signature;
use crate::object::{Commit, Object, ObjectKind, Tree};

/// Name of the repository directory inside the worktree.
pub const GIT_DIR: &str = ".grit";

/// An open repository: the worktree root, the `.grit` directory, and the
/// object database. Every operation takes an explicit `Repo`; there is no
/// process-global repository state.
pub struct Repo {
    worktree: Utf8PathBuf,
    git_dir: Utf8PathBuf,
    pub database: Database,
}

impl Repo {
    /// Initialise a new repository at `worktree`.
    ///
    /// HEAD starts as an indirect ref to `refs/heads/master`; the branch ref
    /// itself is created by the first commit.
    pub fn init(worktree: &Utf8Path) -> Result<()> {
        trace!(path = ?worktree, "Initialising repo");
        let git_dir = worktree.join(GIT_DIR);
        if git_dir.exists() {
            warn!("Repo already exists, init will do nothing");
            return Ok(());
        }

        for d in ["objects", "refs/tags", "refs/heads"] {
            let dir = git_dir.join(d);
            trace!(path = ?dir, "Creating directory");
            std::fs::create_dir_all(dir)?;
        }

        std::fs::write(git_dir.join("HEAD"), "ref: refs/heads/master\n")?;

        Ok(())
    }

    /// Open the repository whose worktree is exactly `worktree`.
    pub fn open(worktree: Utf8PathBuf) -> Result<Self> {
        let git_dir = worktree.join(GIT_DIR);
        if !git_dir.is_dir() {
            return Err(Error::NotARepository(worktree));
        }
        let database = Database::new(&git_dir);
        trace!(path = ?worktree, "Opened repo");
        Ok(Self {
            worktree,
            git_dir,
            database,
        })
    }

    /// Walk upward from `start` until a directory containing `.grit` is
    /// found.
    pub fn discover(start: &Utf8Path) -> Result<Self> {
        let mut dir = start;
        loop {
            if dir.join(GIT_DIR).is_dir() {
                return Self::open(dir.to_owned());
            }
            dir = match dir.parent() {
                Some(parent) => parent,
                None => return Err(Error::NotARepository(start.to_owned())),
            };
        }
    }

    pub fn worktree(&self) -> &Utf8Path {
        &self.worktree
    }

    pub fn git_dir(&self) -> &Utf8Path {
        &self.git_dir
    }

    pub fn index_path(&self) -> Utf8PathBuf {
        self.git_dir.join("index")
    }

    pub fn read_index(&self) -> Result<Index> {
        Index::read(&self.index_path())
    }

    /// Turn a user-supplied path into a worktree-relative one.
    ///
    /// Absolute paths must point inside the worktree; relative paths are
    /// taken as worktree-relative and normalized lexically. A path escaping
    /// the worktree through `..` is rejected.
    pub fn worktree_relative(&self, path: &Utf8Path) -> Result<Utf8PathBuf> {
        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.worktree) {
                Ok(rel) => rel,
                Err(_) => return Err(Error::PathOutsideWorktree(path.to_owned())),
            }
        } else {
            path
        };

        let mut normalized = Utf8PathBuf::new();
        for component in relative.components() {
            match component {
                Utf8Component::Normal(part) => normalized.push(part),
                Utf8Component::CurDir => {}
                Utf8Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(Error::PathOutsideWorktree(path.to_owned()));
                    }
                }
                Utf8Component::RootDir | Utf8Component::Prefix(_) => {
                    return Err(Error::PathOutsideWorktree(path.to_owned()))
                }
            }
        }
        Ok(normalized)
    }

    /// Commit the current index.
    ///
    /// The index lock is held for the whole sequence even though nothing is
    /// written back to it, so a concurrent `add` cannot change the staging
    /// list between the tree build and the ref update.
    pub fn commit(&mut self, message: &str) -> Result<Digest> {
        trace!(path = ?self.worktree, %message, "Starting commit");
        let lock = LockedFile::acquire(&self.index_path())?;

        let index = self.read_index()?;
        let tree_id = self.tree_from_index(&index)?;

        let parent = match self.object_find("HEAD", Some(ObjectKind::Commit), true) {
            Ok(Some(oid)) => Some(oid),
            Ok(None) => None,
            Err(Error::ReferenceNotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let author = Signature::from_env()?;
        let commit = Commit::new(tree_id, parent.into_iter().collect(), author, message);
        let oid = self.database.store(&Object::Commit(commit))?;

        self.advance_head(&oid)?;
        drop(lock);

        Ok(oid)
    }

    /// Materialize the tree of `name` (anything `object_find` accepts that
    /// leads to a commit) into `target`, which must be empty or absent.
    pub fn checkout(&self, name: &str, target: &Utf8Path) -> Result<()> {
        let oid = self
            .object_find(name, Some(ObjectKind::Commit), true)?
            .ok_or_else(|| Error::ReferenceNotFound(name.to_owned()))?;

        let commit = self
            .database
            .load(&oid)?
            .into_commit()
            .expect("object_find returned a commit id");
        let tree = self.load_tree(&commit.tree_id()?)?;

        if target.exists() {
            if !target.is_dir() {
                return Err(Error::NotAFile(target.to_owned()));
            }
            if target.read_dir_utf8()?.next().is_some() {
                return Err(Error::TargetNotEmpty(target.to_owned()));
            }
        } else {
            std::fs::create_dir_all(target)?;
        }

        self.tree_checkout(&tree, target)
    }

    fn tree_checkout(&self, tree: &Tree, dest: &Utf8Path) -> Result<()> {
        for entry in tree.entries() {
            let path = dest.join(entry.name());
            match self.database.load(entry.oid())? {
                Object::Tree(subtree) => {
                    trace!(?path, "Checking out subtree");
                    std::fs::create_dir(&path)?;
                    self.tree_checkout(&subtree, &path)?;
                }
                Object::Blob(blob) => {
                    trace!(?path, "Checking out blob");
                    std::fs::write(&path, blob.data())?;
                }
                Object::Commit(_) | Object::Tag(_) => {
                    return Err(Error::MalformedObject(format!(
                        "tree entry '{}' points at a non-blob, non-tree object",
                        entry.name()
                    )));
                }
            }
        }
        Ok(())
    }

    fn load_tree(&self, oid: &Digest) -> Result<Tree> {
        self.database.load(oid)?.into_tree().ok_or_else(|| {
            Error::MalformedObject(format!("{oid:x} is not a tree"))
        })
    }
}
