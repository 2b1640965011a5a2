use tracing::trace;

use super::{Index, IndexEntry};
use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::filemode::FileMode;

const HEADER_LEN: usize = 12;
/// Fixed bytes per entry before the name: ten u32 fields, the 20-byte sha,
/// and the u16 flags.
const FIXED_ENTRY_LEN: usize = 62;

pub(super) fn parse_index(bytes: &[u8]) -> Result<Index> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::CorruptIndex("truncated header"));
    }

    if &bytes[0..4] != b"DIRC" {
        return Err(Error::CorruptIndex("bad signature"));
    }

    let version = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
    if version != 2 {
        return Err(Error::UnsupportedIndexVersion(version));
    }

    let num_entries = u32::from_be_bytes(bytes[8..12].try_into().unwrap());

    let mut entries = Vec::with_capacity(num_entries.min(1 << 16) as usize);
    let mut offset = HEADER_LEN;
    for i in 0..num_entries {
        entries.push(parse_entry(bytes, &mut offset, i as usize)?);
    }

    // Real git appends extensions and a trailing checksum; neither is part
    // of this format, so anything after the last entry is ignored.
    if offset < bytes.len() {
        trace!(
            "Ignoring {} trailing bytes after index entries",
            bytes.len() - offset
        );
    }

    Ok(Index { version, entries })
}

fn take<'a>(bytes: &'a [u8], offset: &mut usize, n: usize) -> Result<&'a [u8]> {
    let slice = bytes
        .get(*offset..*offset + n)
        .ok_or(Error::CorruptIndex("truncated entry"))?;
    *offset += n;
    Ok(slice)
}

fn read_u32(bytes: &[u8], offset: &mut usize) -> Result<u32> {
    Ok(u32::from_be_bytes(take(bytes, offset, 4)?.try_into().unwrap()))
}

fn parse_entry(bytes: &[u8], offset: &mut usize, entry_idx: usize) -> Result<IndexEntry> {
    let entry_start = *offset;

    let ctime_s = read_u32(bytes, offset)?;
    let ctime_n = read_u32(bytes, offset)?;
    let mtime_s = read_u32(bytes, offset)?;
    let mtime_n = read_u32(bytes, offset)?;
    let dev = read_u32(bytes, offset)?;
    let ino = read_u32(bytes, offset)?;

    let mode = FileMode(read_u32(bytes, offset)?);
    if !matches!(
        mode.object_type(),
        FileMode::TYPE_REGULAR | FileMode::TYPE_SYMLINK | FileMode::TYPE_GITLINK
    ) {
        return Err(Error::CorruptIndex("unsupported entry mode type"));
    }

    let uid = read_u32(bytes, offset)?;
    let gid = read_u32(bytes, offset)?;
    let size = read_u32(bytes, offset)?;

    let oid = Digest(take(bytes, offset, 20)?.try_into().unwrap());

    let flags = u16::from_be_bytes(take(bytes, offset, 2)?.try_into().unwrap());
    if flags & 0x4000 != 0 {
        return Err(Error::UnsupportedExtendedFlag(entry_idx));
    }
    let assume_valid = flags & 0x8000 != 0;
    let stage = ((flags >> 12) & 0b11) as u8;
    let name_len = (flags & IndexEntry::MAX_NAME_LEN) as usize;

    // Names that fit the 12-bit field are read by length; at the cap the
    // field is unreliable and the name runs to its NUL terminator instead.
    let name = if name_len < IndexEntry::MAX_NAME_LEN as usize {
        let name = take(bytes, offset, name_len)?;
        if take(bytes, offset, 1)? != b"\0" {
            return Err(Error::CorruptIndex("entry name is not NUL-terminated"));
        }
        name
    } else {
        let name_end = memchr::memchr(b'\0', &bytes[*offset..])
            .map(|i| *offset + i)
            .ok_or(Error::CorruptIndex("entry name is not NUL-terminated"))?;
        let name = &bytes[*offset..name_end];
        *offset = name_end + 1;
        name
    };
    let name = std::str::from_utf8(name)
        .map_err(|_| Error::CorruptIndex("entry name is not valid UTF-8"))?
        .to_owned();

    // Entries are zero-padded so their total size is a multiple of 8.
    let entry_len = FIXED_ENTRY_LEN + name.len() + 1;
    let padding = (8 - entry_len % 8) % 8;
    if bytes.len() < entry_start + entry_len + padding {
        return Err(Error::CorruptIndex("truncated entry padding"));
    }
    *offset = entry_start + entry_len + padding;

    Ok(IndexEntry {
        ctime_s,
        ctime_n,
        mtime_s,
        mtime_n,
        dev,
        ino,
        mode,
        uid,
        gid,
        size,
        oid,
        assume_valid,
        stage,
        name,
    })
}
