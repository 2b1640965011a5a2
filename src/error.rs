use camino::Utf8PathBuf;

use crate::digest::Digest;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the storage core.
///
/// Structural decode failures are never swallowed; the one documented
/// tolerance is a missing or zero-length index file, which is read as a new
/// empty index rather than an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("object not found in database: {0:x}")]
    ObjectNotFound(Digest),

    #[error("malformed object: {0}")]
    MalformedObject(String),

    #[error("unsupported object type '{0}'")]
    UnsupportedObjectType(String),

    #[error("corrupt index: {0}")]
    CorruptIndex(&'static str),

    #[error("unsupported index version {0} (only version 2 is supported)")]
    UnsupportedIndexVersion(u32),

    #[error("index entry {0} has the extended flag set")]
    UnsupportedExtendedFlag(usize),

    #[error("no such reference: '{0}'")]
    ReferenceNotFound(String),

    #[error("ambiguous reference '{name}': candidates are:{}", list_candidates(.candidates))]
    AmbiguousReference {
        name: String,
        candidates: Vec<Digest>,
    },

    #[error("dereferencing '{0}' exceeded {1} links without reaching the requested type")]
    DerefLimitExceeded(String, usize),

    #[error("malformed ref '{path}': '{contents}'")]
    MalformedRef {
        path: Utf8PathBuf,
        contents: String,
    },

    #[error("invalid ref name: '{0}'")]
    InvalidRefName(String),

    #[error("path is outside the worktree: {0}")]
    PathOutsideWorktree(Utf8PathBuf),

    #[error("not a regular file: {0}")]
    NotAFile(Utf8PathBuf),

    #[error("path is not tracked in the index: {0}")]
    NotInIndex(Utf8PathBuf),

    #[error("the index is locked by another process")]
    IndexLocked,

    #[error("not a grit repository (or any parent up to the filesystem root): {0}")]
    NotARepository(Utf8PathBuf),

    #[error("target directory is not empty: {0}")]
    TargetNotEmpty(Utf8PathBuf),

    #[error("author identity is not configured: set {0}")]
    AuthorUnset(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn list_candidates(candidates: &[Digest]) -> String {
    let mut out = String::new();
    for candidate in candidates {
        out.push_str("\n - ");
        out.push_str(&candidate.to_hex());
    }
    out
}
