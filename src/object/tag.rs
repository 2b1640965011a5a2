use bstr::BStr;

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::kvlm::Kvlm;

use super::commit::{digest_field, Signature};
use super::ObjectKind;

/// An annotated tag: a KVLM body with `object`, `type`, `tag` and `tagger`
/// fields plus a message. The `object` field is what the tag dereferences to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    kvlm: Kvlm,
}

impl Tag {
    pub fn new(
        object: Digest,
        kind: ObjectKind,
        name: &str,
        tagger: Signature,
        message: &str,
    ) -> Self {
        let mut kvlm = Kvlm::new(Vec::new(), format!("{}\n", message.trim_end()));
        kvlm.push("object", object.to_hex());
        kvlm.push("type", kind.as_str());
        kvlm.push("tag", name);
        kvlm.push("tagger", tagger.to_string());

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

    /// The id the tag points at.
    pub fn object_id(&self) -> Result<Digest> {
        digest_field(&self.kvlm, b"object")?
            .ok_or_else(|| Error::MalformedObject("tag has no object field".to_owned()))
    }

    pub fn name(&self) -> Option<&BStr> {
        self.kvlm.get(b"tag")
    }

    pub fn tagger(&self) -> Option<&BStr> {
        self.kvlm.get(b"tagger")
    }

    pub fn message(&self) -> &BStr {
        self.kvlm.message()
    }

    pub fn kvlm(&self) -> &Kvlm {
        &self.kvlm
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::commit::Timestamp;
    use super::*;

    #[test]
    fn tag_round_trip() {
        let tagger = Signature {
            name: "Test Author".to_owned(),
            email: "test@example.com".to_owned(),
            when: Timestamp {
                unix: 1658312219,
                offset: 0,
            },
        };
        let tag = Tag::new(
            Digest([9; 20]),
            ObjectKind::Commit,
            "v1.0.0",
            tagger,
            "first release",
        );

        let reparsed = Tag::parse(&tag.serialize()).unwrap();
        assert_eq!(reparsed.object_id().unwrap(), Digest([9; 20]));
        assert_eq!(reparsed.name().unwrap(), "v1.0.0");
        assert_eq!(reparsed.message(), "first release\n");
        assert_eq!(reparsed, tag);
    }

    #[test]
    fn tag_without_object_errors_on_access() {
        let tag = Tag::parse(b"tag v0\n\nmsg\n").unwrap();
        assert!(matches!(tag.object_id(), Err(Error::MalformedObject(_))));
    }
}
