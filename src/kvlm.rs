//! The key-value-list-with-message encoding used by commit and tag objects.
//!
//! A KVLM body is a run of `key SP value LF` header lines followed by a blank
//! line and a free-form message. A value may span several lines: each
//! embedded newline is followed by a single continuation space on disk, which
//! is stripped on parse and re-inserted on serialize.
//!
//! Duplicate keys are legal (a merge commit carries several `parent` lines)
//! and order-significant, so the pairs are an ordered list, never a map.

use bstr::{BStr, BString, ByteSlice};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Kvlm {
    pairs: Vec<(BString, BString)>,
    message: BString,
}

impl Kvlm {
    pub fn new(pairs: Vec<(BString, BString)>, message: impl Into<BString>) -> Self {
        Self {
            pairs,
            message: message.into(),
        }
    }

    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut pairs = Vec::new();
        let mut pos = 0;

        let message = loop {
            if pos >= raw.len() {
                break BString::default();
            }

            // A newline at the cursor is the blank separator line; everything
            // after it is the message, verbatim.
            if raw[pos] == b'\n' {
                break raw[pos + 1..].as_bstr().to_owned();
            }

            let spc = memchr::memchr(b' ', &raw[pos..]).map(|i| pos + i);
            let nl = memchr::memchr(b'\n', &raw[pos..]).map(|i| pos + i);
            let spc = match (spc, nl) {
                (Some(spc), Some(nl)) if spc < nl => spc,
                _ => {
                    return Err(Error::MalformedObject(
                        "kvlm: header line without a key".to_owned(),
                    ))
                }
            };

            let key = raw[pos..spc].as_bstr().to_owned();

            // The value ends at the first newline not followed by a
            // continuation space.
            let mut cursor = spc;
            let end = loop {
                let nl = memchr::memchr(b'\n', &raw[cursor + 1..])
                    .map(|i| cursor + 1 + i)
                    .ok_or_else(|| {
                        Error::MalformedObject("kvlm: unterminated value".to_owned())
                    })?;
                if raw.get(nl + 1) == Some(&b' ') {
                    cursor = nl;
                } else {
                    break nl;
                }
            };

            pairs.push((key, unfold(&raw[spc + 1..end])));
            pos = end + 1;
        };

        Ok(Self { pairs, message })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (key, value) in &self.pairs {
            out.extend_from_slice(key);
            out.push(b' ');
            for (i, &byte) in value.iter().enumerate() {
                out.push(byte);
                if byte == b'\n' && i != value.len() - 1 {
                    out.push(b' ');
                }
            }
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }

    /// The first value stored under `key`, if any.
    pub fn get(&self, key: &[u8]) -> Option<&BStr> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_bstr())
    }

    /// Every value stored under `key`, in insertion order.
    pub fn get_all<'a>(&'a self, key: &'a [u8]) -> impl Iterator<Item = &'a BStr> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_bstr())
    }

    pub fn push(&mut self, key: impl Into<BString>, value: impl Into<BString>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn pairs(&self) -> &[(BString, BString)] {
        &self.pairs
    }

    pub fn message(&self) -> &BStr {
        self.message.as_bstr()
    }
}

/// Strip the continuation space that follows every embedded newline.
fn unfold(raw: &[u8]) -> BString {
    let mut out = Vec::with_capacity(raw.len());
    let mut iter = raw.iter();
    while let Some(&byte) = iter.next() {
        out.push(byte);
        if byte == b'\n' {
            // The scan in `parse` only lands here when the next byte is the
            // continuation space.
            iter.next();
        }
    }
    BString::from(out)
}
