//! The binary staging area: a `DIRC` version-2 table of tracked-path records.

mod parse;
mod write;

use camino::Utf8Path;
use tracing::trace;

use crate::digest::Digest;
use crate::error::Result;
use crate::filemode::FileMode;

/// One tracked path: the stat fields git uses for change detection, the blob
/// id, and the flag bits (assume-valid, merge stage, name length).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct IndexEntry {
    ctime_s: u32,
    ctime_n: u32,

    mtime_s: u32,
    mtime_n: u32,

    dev: u32,
    ino: u32,

    mode: FileMode,

    uid: u32,
    gid: u32,
    size: u32,
    oid: Digest,

    assume_valid: bool,
    stage: u8,

    name: String,
}

impl IndexEntry {
    /// On-disk name length is capped at 0xFFF; longer names are written in
    /// full and recovered by scanning for the NUL terminator.
    const MAX_NAME_LEN: u16 = 0xfff;

    /// Build an entry for a worktree file from its `lstat` results.
    ///
    /// Permission bits are normalized the way git stores them: regular files
    /// are either 644 or 755, symlinks carry no permission bits.
    pub fn from_stat(name: String, oid: Digest, stat: &libc::stat) -> Self {
        let mode = if stat.st_mode & libc::S_IFMT == libc::S_IFLNK {
            FileMode::SYMLINK
        } else if FileMode(stat.st_mode).is_executable() {
            FileMode::EXECUTABLE
        } else {
            FileMode::REGULAR
        };

        Self {
            // Git stores the low 32 bits of each stat field.
            ctime_s: stat.st_ctime as u32,
            ctime_n: stat.st_ctime_nsec as u32,
            mtime_s: stat.st_mtime as u32,
            mtime_n: stat.st_mtime_nsec as u32,
            dev: stat.st_dev as u32,
            ino: stat.st_ino as u32,
            mode,
            uid: stat.st_uid,
            gid: stat.st_gid,
            size: stat.st_size as u32,
            oid,
            assume_valid: false,
            stage: 0,
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn oid(&self) -> &Digest {
        &self.oid
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn stage(&self) -> u8 {
        self.stage
    }

    pub fn assume_valid(&self) -> bool {
        self.assume_valid
    }

    fn flags(&self) -> u16 {
        let mut flags = u16::try_from(self.name.len())
            .unwrap_or(Self::MAX_NAME_LEN)
            .min(Self::MAX_NAME_LEN);
        flags |= u16::from(self.stage & 0b11) << 12;
        if self.assume_valid {
            flags |= 0x8000;
        }
        flags
    }
}

impl Ord for IndexEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.name, self.stage).cmp(&(&other.name, other.stage))
    }
}

impl PartialOrd for IndexEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The staging table. Entries are kept sorted by (name, stage) at all times,
/// and are written back in exactly that order.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Index {
    version: u32,
    entries: Vec<IndexEntry>,
}

impl Default for Index {
    fn default() -> Self {
        Self {
            version: 2,
            entries: Vec::new(),
        }
    }
}

impl Index {
    /// Read the index file at `path`.
    ///
    /// A missing or zero-length file is a new, empty, version-2 index; that
    /// is the one documented recovery. Anything else that fails to decode is
    /// a typed error, never a silent reinitialization.
    pub fn read(path: &Utf8Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(?path, "No index file, starting empty");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.is_empty() {
            trace!(?path, "Zero-length index file, starting empty");
            return Ok(Self::default());
        }

        let index = parse::parse_index(&bytes)?;
        trace!(?path, "Opened index with {} entries", index.entries.len());
        Ok(index)
    }

    /// Write the index to `path`, reproducing the on-disk layout exactly.
    ///
    /// Callers mutating a shared index file should write through a
    /// [`LockedFile`](crate::lock::LockedFile) instead and use
    /// [`serialize`](Self::serialize).
    pub fn write(&self, path: &Utf8Path) -> Result<()> {
        std::fs::write(path, self.serialize())?;
        Ok(())
    }

    pub fn serialize(&self) -> Vec<u8> {
        write::write_index(self)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry, replacing any existing entry for the same path and
    /// stage, keeping the list sorted.
    pub fn add_entry(&mut self, entry: IndexEntry) {
        match self
            .entries
            .binary_search_by(|e| (e.name.as_str(), e.stage).cmp(&(entry.name.as_str(), entry.stage)))
        {
            Ok(idx) => self.entries[idx] = entry,
            Err(idx) => self.entries.insert(idx, entry),
        }
    }

    /// Remove every entry for `name` (all stages). Returns whether anything
    /// was removed.
    pub fn remove_entry(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        before != self.entries.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }
}
