use std::cmp::Ordering;

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::filemode::FileMode;

/// One line of a tree object: `<mode> SP <name> NUL <20 raw sha bytes>`.
///
/// The mode is kept in its 6-byte ASCII octal form. Trees written by other
/// tools may drop the leading zero of a directory mode; parsing normalizes
/// those back to 6 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    mode: [u8; 6],
    name: String,
    oid: Digest,
}

impl TreeEntry {
    pub fn file(mode: FileMode, name: String, oid: Digest) -> Self {
        Self {
            mode: mode.tree_bytes(),
            name,
            oid,
        }
    }

    pub fn directory(name: String, oid: Digest) -> Self {
        Self {
            mode: *b"040000",
            name,
            oid,
        }
    }

    pub fn mode_bytes(&self) -> &[u8; 6] {
        &self.mode
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn oid(&self) -> &Digest {
        &self.oid
    }

    pub fn is_tree(&self) -> bool {
        self.mode.starts_with(b"04")
    }

    /// Tree entries sort by name, with directories comparing as if their
    /// name carried a trailing slash: `dir` ("dir/") sorts before `dir.txt`.
    fn sort_key(&self) -> String {
        if self.is_tree() {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }

    fn parse_one(bytes: &[u8]) -> Result<(Self, usize)> {
        let spc = memchr::memchr(b' ', bytes)
            .ok_or_else(|| Error::MalformedObject("tree entry has no mode".to_owned()))?;
        if !(5..=6).contains(&spc) {
            return Err(Error::MalformedObject(format!(
                "tree entry mode is {spc} bytes long"
            )));
        }

        let mut mode = *b"000000";
        mode[6 - spc..].copy_from_slice(&bytes[..spc]);
        if !mode.iter().all(|b| (b'0'..=b'7').contains(b)) {
            return Err(Error::MalformedObject("tree entry mode is not octal".to_owned()));
        }

        let nul = memchr::memchr(b'\0', &bytes[spc + 1..])
            .map(|i| spc + 1 + i)
            .ok_or_else(|| Error::MalformedObject("tree entry name is unterminated".to_owned()))?;
        let name = std::str::from_utf8(&bytes[spc + 1..nul])
            .map_err(|_| Error::MalformedObject("tree entry name is not valid UTF-8".to_owned()))?
            .to_owned();

        let sha_end = nul + 21;
        if bytes.len() < sha_end {
            return Err(Error::MalformedObject(
                "tree entry is truncated before its sha".to_owned(),
            ));
        }
        let oid = Digest(bytes[nul + 1..sha_end].try_into().unwrap());

        Ok((Self { mode, name, oid }, sha_end))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One directory snapshot: an ordered run of entries pointing at blobs and
/// sub-trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Build a tree from arbitrary-order entries, sorting them into the
    /// serialized order.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_unstable();
        Self { entries }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut entries = Vec::new();
        let mut rest = bytes;
        while !rest.is_empty() {
            let (entry, consumed) = TreeEntry::parse_one(rest)?;
            entries.push(entry);
            rest = &rest[consumed..];
        }
        Ok(Self { entries })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(&entry.mode);
            out.push(b' ');
            out.extend_from_slice(entry.name.as_bytes());
            out.push(b'\0');
            out.extend_from_slice(&*entry.oid);
        }
        out
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn oid(byte: u8) -> Digest {
        Digest([byte; 20])
    }

    #[test]
    fn directory_sorts_before_longer_file_name() {
        // "dir" compares as "dir/", which sorts before "dir.txt" ('/' < '.').
        let tree = Tree::new(vec![
            TreeEntry::file(FileMode::REGULAR, "dir.txt".to_owned(), oid(1)),
            TreeEntry::directory("dir".to_owned(), oid(2)),
        ]);

        let names: Vec<_> = tree.entries().iter().map(TreeEntry::name).collect();
        assert_eq!(names, ["dir", "dir.txt"]);
    }

    #[test]
    fn plain_files_sort_by_name() {
        let tree = Tree::new(vec![
            TreeEntry::file(FileMode::REGULAR, "b".to_owned(), oid(1)),
            TreeEntry::file(FileMode::EXECUTABLE, "a".to_owned(), oid(2)),
            TreeEntry::file(FileMode::REGULAR, "a.txt".to_owned(), oid(3)),
        ]);

        let names: Vec<_> = tree.entries().iter().map(TreeEntry::name).collect();
        assert_eq!(names, ["a", "a.txt", "b"]);
    }

    #[test]
    fn serialize_parse_round_trip() {
        let tree = Tree::new(vec![
            TreeEntry::file(FileMode::REGULAR, "a.txt".to_owned(), oid(1)),
            TreeEntry::directory("sub".to_owned(), oid(2)),
            TreeEntry::file(FileMode::SYMLINK, "link".to_owned(), oid(3)),
        ]);

        let parsed = Tree::parse(&tree.serialize()).unwrap();
        assert_eq!(parsed, tree);
    }

    #[test]
    fn five_byte_mode_is_normalized() {
        // A directory mode written without its leading zero.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"40000 sub\0");
        bytes.extend_from_slice(&[2; 20]);

        let tree = Tree::parse(&bytes).unwrap();
        assert_eq!(tree.entries()[0].mode_bytes(), b"040000");
        assert!(tree.entries()[0].is_tree());
        // Serializing writes the normalized 6-byte form.
        assert!(tree.serialize().starts_with(b"040000 sub\0"));
    }

    #[test]
    fn truncated_and_garbage_entries_are_rejected() {
        assert!(matches!(
            Tree::parse(b"100644 a.txt\0tooshort"),
            Err(Error::MalformedObject(_))
        ));
        assert!(matches!(
            Tree::parse(b"100644 unterminated-name"),
            Err(Error::MalformedObject(_))
        ));
        assert!(matches!(
            Tree::parse(b"10064400 name\0"),
            Err(Error::MalformedObject(_))
        ));
    }
}
