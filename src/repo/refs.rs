use std::fs::File;
use std::io::Write;
use std::str::FromStr;

use camino::Utf8Path;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::object::commit::Signature;
use crate::object::{Object, ObjectKind, Tag};

/// Longest tag/commit dereference chain `object_find` will follow. The loop
/// in a literal port has no cycle guard; bounding it turns a tag cycle in a
/// broken repository into an error instead of a hang.
pub const MAX_DEREF: usize = 32;

/// Contains all characters that cannot appear in a ref name.
///
/// In git, the character `'*'` is allowed in ref names if the environment
/// variable `REFNAME_REFSPEC_PATTERN` is set. Grit does not allow this, so
/// `'*'` appears in this array.
///
/// See: <https://github.com/git/git/blob/795ea8776befc95ea2becd8020c7a284677b4161/refs.c#L48-L57>
const DISALLOWED_CHARACTERS: [char; 40] = [
    '\x01', '\x02', '\x03', '\x04', '\x05', '\x06', '\x07', '\x08', '\t', '\n', '\x0b', '\x0c',
    '\r', '\x0e', '\x0f', '\x10', '\x11', '\x12', '\x13', '\x14', '\x15', '\x16', '\x17', '\x18',
    '\x19', '\x1a', '\x1b', '\x1c', '\x1d', '\x1e', '\x1f', ' ', '*', ':', '?', '[', '\\', '^',
    '~', '\x7f',
];

/// Check whether a string is a valid ref name.
///
/// This is not a port of `check_refname_component` from git, but is based on
/// the documentation for that function.
///
/// Disallowed paths are any path where:
///
/// - it (or any path component) begins with `'.'`
/// - it contains double dots `".."`
/// - it contains ASCII control characters
/// - it contains ':', '?', '[', '\', '^', '~', SP, or TAB anywhere
/// - it contains `'*'`
/// - it ends with `'/'`
/// - it ends with `".lock"`
/// - it contains `"@{"`
///
/// See: <https://github.com/git/git/blob/795ea8776befc95ea2becd8020c7a284677b4161/refs.c#L59-L77>
pub fn is_valid_ref_name(name: &str) -> bool {
    !((name.chars().any(|c| DISALLOWED_CHARACTERS.contains(&c)))
        || name.is_empty()
        || name.starts_with('.')
        || name.contains("/.")
        || name.contains("..")
        || name.ends_with('/')
        || name.ends_with(".lock")
        || name.contains("@{"))
}

impl super::Repo {
    /// Resolve a ref file (path relative to the git dir) to an object id,
    /// following `ref: ` indirections. A missing file resolves to `None`.
    pub fn resolve_ref(&self, path: &Utf8Path) -> Result<Option<Digest>> {
        let full = self.git_dir.join(path);
        if !full.is_file() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&full)?;
        let contents = contents.trim();
        match contents.strip_prefix("ref: ") {
            Some(target) => {
                trace!(?path, %target, "Following ref indirection");
                self.resolve_ref(Utf8Path::new(target))
            }
            None => match Digest::from_str(contents) {
                Ok(oid) => Ok(Some(oid)),
                Err(_) => Err(Error::MalformedRef {
                    path: full,
                    contents: contents.to_owned(),
                }),
            },
        }
    }

    /// Every id `name` could refer to, across three independent lookup
    /// strategies: HEAD, abbreviated/full hex id, and the tag/branch ref
    /// namespaces. The strategies' matches are unioned without dedup.
    pub fn resolve_name(&self, name: &str) -> Result<Vec<Digest>> {
        static HEX_NAME: Lazy<Regex> =
            Lazy::new(|| Regex::new("^[0-9A-Fa-f]{4,40}$").unwrap());

        let mut candidates = Vec::new();

        if name.trim().is_empty() {
            return Ok(candidates);
        }

        if name == "HEAD" {
            if let Some(oid) = self.resolve_ref(Utf8Path::new("HEAD"))? {
                candidates.push(oid);
            }
            return Ok(candidates);
        }

        if HEX_NAME.is_match(name) {
            candidates.extend(self.database.match_prefix(name)?);
        }

        for namespace in ["refs/tags", "refs/heads"] {
            if let Some(oid) = self.resolve_ref(&Utf8Path::new(namespace).join(name))? {
                candidates.push(oid);
            }
        }

        Ok(candidates)
    }

    /// Resolve `name` to the single object it denotes, then (when `want` is
    /// set) chase tags (and, for `want == Tree`, commits) until an object
    /// of the wanted kind is reached.
    ///
    /// `Ok(None)` means the name resolved cleanly but doesn't lead to an
    /// object of the wanted kind; zero or multiple candidates are errors.
    pub fn object_find(
        &self,
        name: &str,
        want: Option<ObjectKind>,
        follow: bool,
    ) -> Result<Option<Digest>> {
        let mut candidates = self.resolve_name(name)?;

        if candidates.is_empty() {
            return Err(Error::ReferenceNotFound(name.to_owned()));
        }
        if candidates.len() > 1 {
            return Err(Error::AmbiguousReference {
                name: name.to_owned(),
                candidates,
            });
        }

        let mut oid = candidates.pop().expect("exactly one candidate");
        let Some(want) = want else {
            return Ok(Some(oid));
        };

        for _ in 0..MAX_DEREF {
            let obj = self.database.load(&oid)?;

            if obj.kind() == want {
                return Ok(Some(oid));
            }
            if !follow {
                return Ok(None);
            }

            match obj {
                Object::Tag(tag) => oid = tag.object_id()?,
                Object::Commit(commit) if want == ObjectKind::Tree => oid = commit.tree_id()?,
                _ => return Ok(None),
            }
        }

        Err(Error::DerefLimitExceeded(name.to_owned(), MAX_DEREF))
    }

    /// Advance whatever HEAD points at (or HEAD itself, when detached) to
    /// `oid`. Creates the branch ref file on the first commit.
    pub(crate) fn advance_head(&self, oid: &Digest) -> Result<()> {
        let head_path = self.git_dir.join("HEAD");
        let contents = std::fs::read_to_string(&head_path).unwrap_or_default();
        match contents.trim().strip_prefix("ref: ") {
            Some(target) => {
                let path = self.git_dir.join(target);
                let parent = path.parent().expect("ref paths always have a parent");
                if !parent.is_dir() {
                    std::fs::create_dir_all(parent)?;
                }
                self.update_ref_file(&path, oid)
            }
            None => self.update_ref_file(&head_path, oid),
        }
    }

    fn update_ref_file(&self, path: &Utf8Path, oid: &Digest) -> Result<()> {
        let mut file = File::create(path)?;
        writeln!(&mut file, "{oid:x}")?;
        Ok(())
    }

    /// Create (or move) a ref under `refs/`, e.g. `tags/v1.0.0`.
    pub fn create_ref(&self, name: &str, oid: &Digest) -> Result<()> {
        if !is_valid_ref_name(name) {
            return Err(Error::InvalidRefName(name.to_owned()));
        }
        let path = self.git_dir.join("refs").join(name);
        let parent = path.parent().expect("ref paths always have a parent");
        std::fs::create_dir_all(parent)?;
        self.update_ref_file(&path, oid)
    }

    /// Tag whatever `target` resolves to as `name`.
    ///
    /// With a message this writes an annotated tag object and points the ref
    /// at it; without one the ref points straight at the target. Returns the
    /// id the ref ends up containing.
    pub fn tag(&self, name: &str, target: &str, message: Option<&str>) -> Result<Digest> {
        if !is_valid_ref_name(name) {
            return Err(Error::InvalidRefName(name.to_owned()));
        }

        let oid = self
            .object_find(target, None, true)?
            .expect("object_find without a wanted kind always yields the candidate");

        let oid = match message {
            Some(message) => {
                let kind = self.database.load(&oid)?.kind();
                let tagger = Signature::from_env()?;
                let tag = Tag::new(oid, kind, name, tagger, message);
                self.database.store(&Object::Tag(tag))?
            }
            None => oid,
        };

        self.create_ref(&format!("tags/{name}"), &oid)?;
        Ok(oid)
    }
}
