use super::{Index, IndexEntry};

pub(super) fn write_index(index: &Index) -> Vec<u8> {
    let mut out = Vec::new();

    out.extend_from_slice(b"DIRC");
    out.extend_from_slice(&index.version.to_be_bytes());
    out.extend_from_slice(&u32::try_from(index.entries.len()).expect("entry count fits a u32").to_be_bytes());

    for entry in &index.entries {
        write_entry(entry, &mut out);
    }

    out
}

fn write_entry(entry: &IndexEntry, out: &mut Vec<u8>) {
    let start_len = out.len();

    out.extend_from_slice(&entry.ctime_s.to_be_bytes());
    out.extend_from_slice(&entry.ctime_n.to_be_bytes());
    out.extend_from_slice(&entry.mtime_s.to_be_bytes());
    out.extend_from_slice(&entry.mtime_n.to_be_bytes());
    out.extend_from_slice(&entry.dev.to_be_bytes());
    out.extend_from_slice(&entry.ino.to_be_bytes());
    out.extend_from_slice(&entry.mode.0.to_be_bytes());
    out.extend_from_slice(&entry.uid.to_be_bytes());
    out.extend_from_slice(&entry.gid.to_be_bytes());
    out.extend_from_slice(&entry.size.to_be_bytes());
    out.extend_from_slice(&*entry.oid);
    out.extend_from_slice(&entry.flags().to_be_bytes());

    out.extend_from_slice(entry.name.as_bytes());
    out.push(b'\0');

    // Zero-pad so the entry's total size is a multiple of 8.
    let len = out.len() - start_len;
    let extra = len % 8;
    if extra != 0 {
        for _ in 0..8 - extra {
            out.push(b'\0');
        }
    }
}
