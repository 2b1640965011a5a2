use std::io::Read;
use std::io::Write;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::*;

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectKind};
use crate::util;

/// The content-addressed object store: `objects/<2-hex>/<38-hex>` files
/// holding the deflate-compressed `"<kind> <len>\0<payload>"` envelope.
pub struct Database {
    database_root: Utf8PathBuf,
}

/// Compute the id an object would be stored under, without touching disk.
pub fn hash_object(obj: &Object) -> Digest {
    Digest::new(&envelope(obj))
}

fn envelope(obj: &Object) -> Vec<u8> {
    let payload = obj.serialize();
    let mut content = Vec::with_capacity(payload.len() + 16);
    content.extend_from_slice(obj.kind().as_str().as_bytes());
    content.push(b' ');
    content.extend_from_slice(payload.len().to_string().as_bytes());
    content.push(b'\0');
    content.extend_from_slice(&payload);
    content
}

impl Database {
    pub fn new(git_dir: impl AsRef<Utf8Path>) -> Self {
        Self {
            database_root: git_dir.as_ref().join("objects"),
        }
    }

    /// Write an object and return its id.
    ///
    /// Writes are idempotent: ids are content-derived, so if the destination
    /// file already exists its contents are already correct and the write is
    /// skipped. New objects land under a temporary name first and are
    /// renamed into place.
    pub fn store(&self, obj: &Object) -> Result<Digest> {
        let content = envelope(obj);
        let oid = Digest::new(&content);
        trace!(oid = %oid.to_hex(), kind = %obj.kind(), "Writing object to database");

        let object_path = self.object_path(&oid);
        if object_path.exists() {
            return Ok(oid);
        }

        let dirname = object_path
            .parent()
            .expect("object paths always have a parent");
        if !dirname.is_dir() {
            std::fs::create_dir_all(dirname)?;
        }

        let temp_path = dirname.join(util::tmp_file_name());
        let mut file = std::fs::File::create(&temp_path)?;

        let mut e = ZlibEncoder::new(Vec::with_capacity(content.len()), Compression::fast());
        e.write_all(&content)?;
        let compressed_bytes = e.finish()?;

        file.write_all(&compressed_bytes)?;
        drop(file);

        std::fs::rename(temp_path, object_path)?;

        Ok(oid)
    }

    /// Read and decode an object.
    pub fn load(&self, oid: &Digest) -> Result<Object> {
        let bytes = self.read_raw(oid)?;

        let space_idx = memchr::memchr(b' ', &bytes).ok_or_else(|| {
            Error::MalformedObject(format!("{oid:x}: header has no type tag"))
        })?;
        let nul_idx = memchr::memchr(b'\0', &bytes[space_idx..])
            .map(|i| space_idx + i)
            .ok_or_else(|| {
                Error::MalformedObject(format!("{oid:x}: header is unterminated"))
            })?;

        let declared_len: usize = std::str::from_utf8(&bytes[space_idx + 1..nul_idx])
            .ok()
            .and_then(|len| len.trim().parse().ok())
            .ok_or_else(|| {
                Error::MalformedObject(format!("{oid:x}: header length is not a number"))
            })?;

        let payload = &bytes[nul_idx + 1..];
        if declared_len != payload.len() {
            return Err(Error::MalformedObject(format!(
                "{oid:x}: declared length {declared_len} but payload is {} bytes",
                payload.len()
            )));
        }

        let kind = ObjectKind::from_bytes(&bytes[..space_idx]).ok_or_else(|| {
            Error::UnsupportedObjectType(String::from_utf8_lossy(&bytes[..space_idx]).into_owned())
        })?;

        Object::parse(kind, payload)
    }

    pub fn contains(&self, oid: &Digest) -> bool {
        self.object_path(oid).exists()
    }

    /// Every stored id whose hex form starts with `name` (4 to 40 hex
    /// characters). Scans a single bucket directory, since the first two
    /// characters fix the bucket.
    pub fn match_prefix(&self, name: &str) -> Result<Vec<Digest>> {
        let name = name.to_ascii_lowercase();
        let (prefix, rest) = name.split_at(2);

        let bucket = self.database_root.join(prefix);
        if !bucket.is_dir() {
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        for entry in bucket.read_dir_utf8()? {
            let entry = entry?;
            let file_name = entry.file_name();
            if !file_name.starts_with(rest) {
                continue;
            }
            // In-flight temporary files are not objects; their names don't
            // parse as hex and are skipped.
            if let Ok(oid) = Digest::from_str(&format!("{prefix}{file_name}")) {
                candidates.push(oid);
            }
        }
        Ok(candidates)
    }

    fn read_raw(&self, oid: &Digest) -> Result<Vec<u8>> {
        trace!(object = %oid.to_hex(), "Reading object from database");

        let object_path = self.object_path(oid);
        if !object_path.exists() {
            return Err(Error::ObjectNotFound(oid.clone()));
        }

        let compressed = std::fs::read(object_path)?;

        let mut d = ZlibDecoder::new(&*compressed);
        let mut decompressed = Vec::new();
        d.read_to_end(&mut decompressed).map_err(|_| {
            Error::MalformedObject(format!("{oid:x}: not a valid zlib stream"))
        })?;

        Ok(decompressed)
    }

    fn object_path(&self, oid: &Digest) -> Utf8PathBuf {
        let mut x = self.database_root.to_owned();
        let oid = oid.to_hex();
        let (prefix, suffix) = oid.split_at(2);
        x.push(prefix);
        x.push(suffix);
        x
    }
}
