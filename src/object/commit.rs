use std::fmt::Display;
use std::str::FromStr;

use bstr::{BStr, ByteSlice};

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::kvlm::Kvlm;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub unix: i64,
    /// Timezone offset in `+hhmm`/`-hhmm` form, e.g. `+0100` is `100`.
    pub offset: i64,
}

impl Timestamp {
    pub fn now() -> Self {
        let now = chrono::offset::Local::now();
        let offset_seconds = now.offset().local_minus_utc() as i64;
        let offset = (offset_seconds / 3600) * 100 + (offset_seconds % 3600) / 60;
        Self {
            unix: now.timestamp(),
            offset,
        }
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}{:04}",
            self.unix,
            if self.offset.is_negative() { '-' } else { '+' },
            self.offset.abs()
        )
    }
}

/// An author/committer/tagger line: `Name <email> unix +hhmm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: Timestamp,
}

impl Signature {
    /// Build a signature for the current instant from the `GRIT_AUTHOR_NAME`
    /// and `GRIT_AUTHOR_EMAIL` environment variables.
    pub fn from_env() -> Result<Self> {
        let name = std::env::var("GRIT_AUTHOR_NAME")
            .map_err(|_| Error::AuthorUnset("GRIT_AUTHOR_NAME"))?;
        let email = std::env::var("GRIT_AUTHOR_EMAIL")
            .map_err(|_| Error::AuthorUnset("GRIT_AUTHOR_EMAIL"))?;
        Ok(Self {
            name,
            email,
            when: Timestamp::now(),
        })
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}> {}", self.name, self.email, self.when)
    }
}

/// A commit: a KVLM body with a `tree` field, zero or more `parent` fields
/// (order-significant for merges), `author` and `committer` lines, and the
/// free-form message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    kvlm: Kvlm,
}

impl Commit {
    pub fn new(
        tree: Digest,
        parents: Vec<Digest>,
        author: Signature,
        message: &str,
    ) -> Self {
        let mut kvlm = Kvlm::new(Vec::new(), format!("{}\n", message.trim_end()));
        kvlm.push("tree", tree.to_hex());
        for parent in parents {
            kvlm.push("parent", parent.to_hex());
        }
        kvlm.push("author", author.to_string());
        kvlm.push("committer", author.to_string());

        Self { kvlm }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            kvlm: Kvlm::parse(bytes)?,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.kvlm.serialize()
    }

    pub fn tree_id(&self) -> Result<Digest> {
        digest_field(&self.kvlm, b"tree")?
            .ok_or_else(|| Error::MalformedObject("commit has no tree field".to_owned()))
    }

    /// Parent ids in the order they appear in the object.
    pub fn parents(&self) -> Result<Vec<Digest>> {
        self.kvlm
            .get_all(b"parent")
            .map(parse_digest)
            .collect()
    }

    pub fn author(&self) -> Option<&BStr> {
        self.kvlm.get(b"author")
    }

    pub fn committer(&self) -> Option<&BStr> {
        self.kvlm.get(b"committer")
    }

    pub fn message(&self) -> &BStr {
        self.kvlm.message()
    }

    pub fn kvlm(&self) -> &Kvlm {
        &self.kvlm
    }
}

pub(super) fn digest_field(kvlm: &Kvlm, key: &[u8]) -> Result<Option<Digest>> {
    kvlm.get(key).map(parse_digest).transpose()
}

fn parse_digest(value: &BStr) -> Result<Digest> {
    let value = value
        .to_str()
        .map_err(|_| Error::MalformedObject(format!("'{value}' is not a valid object id")))?;
    Digest::from_str(value.trim())
        .map_err(|_| Error::MalformedObject(format!("'{value}' is not a valid object id")))
}
