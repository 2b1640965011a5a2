use std::collections::HashMap;

use pretty_assertions::assert_eq;

use crate::digest::Digest;
use crate::error::Error;
use crate::object::commit::Signature;
use crate::object::{Blob, Object, ObjectKind, Tag};
use crate::repo::refs::MAX_DEREF;
use crate::test::{init_repo, set_author, tempdir};
use crate::testfiles;

#[test]
fn resolve_ref_follows_indirections() {
    let (_guard, dir) = tempdir();
    let mut repo = init_repo(&dir);

    testfiles!(dir, ["file"]);
    repo.add(&[".".into()]).unwrap();
    let commit_id = repo.commit("msg").unwrap();

    // init wrote HEAD as "ref: refs/heads/master"; add one more level.
    std::fs::write(
        repo.git_dir().join("refs/heads/alias"),
        "ref: refs/heads/master\n",
    )
    .unwrap();

    assert_eq!(
        repo.resolve_ref("refs/heads/alias".into()).unwrap().unwrap(),
        commit_id
    );
    assert_eq!(repo.resolve_ref("HEAD".into()).unwrap().unwrap(), commit_id);
    assert_eq!(repo.resolve_ref("refs/heads/missing".into()).unwrap(), None);

    // resolve_name finds the alias through the refs/heads namespace.
    assert_eq!(repo.resolve_name("alias").unwrap(), vec![commit_id]);
}

#[test]
fn malformed_ref_contents_are_an_error() {
    let (_guard, dir) = tempdir();
    let repo = init_repo(&dir);

    std::fs::write(repo.git_dir().join("refs/heads/bad"), "not-a-hex-id\n").unwrap();
    assert!(matches!(
        repo.resolve_name("bad"),
        Err(Error::MalformedRef { .. })
    ));
}

#[test]
fn unknown_names_are_reference_not_found() {
    let (_guard, dir) = tempdir();
    let repo = init_repo(&dir);

    assert!(matches!(
        repo.object_find("nothing", None, true),
        Err(Error::ReferenceNotFound(_))
    ));
    // Resolving an empty name yields no candidates rather than panicking.
    assert!(repo.resolve_name("  ").unwrap().is_empty());
}

#[test]
fn abbreviated_ids_resolve_and_collisions_are_ambiguous() {
    let (_guard, dir) = tempdir();
    let repo = init_repo(&dir);

    // Store blobs until two ids share a 4-character prefix. With a 16-bit
    // prefix space a few hundred objects all but guarantee a collision.
    let mut seen: HashMap<String, Digest> = HashMap::new();
    let mut collision = None;
    for i in 0..20_000u32 {
        let oid = repo
            .database
            .store(&Object::Blob(Blob::new(format!("filler {i}\n").into_bytes())))
            .unwrap();
        let prefix = oid.to_hex()[..4].to_owned();
        if let Some(other) = seen.insert(prefix.clone(), oid.clone()) {
            collision = Some((prefix, other, oid));
            break;
        }
    }
    let (prefix, first, second) = collision.expect("a 4-char prefix collision in 20k objects");

    // An unambiguous abbreviation resolves to its one object. Only the
    // first collision broke the loop, so every other stored id has a unique
    // 4-character (and so 8-character) prefix.
    let unique = seen
        .values()
        .find(|d| **d != first && **d != second)
        .cloned()
        .expect("some unique prefix exists");
    let found = repo
        .object_find(&unique.to_hex()[..8], None, true)
        .unwrap()
        .unwrap();
    assert_eq!(found, unique);

    // The colliding prefix yields exactly both candidates.
    let mut candidates = repo.resolve_name(&prefix).unwrap();
    candidates.sort_by_key(Digest::to_hex);
    let mut expected = vec![first, second];
    expected.sort_by_key(Digest::to_hex);
    assert_eq!(candidates, expected);

    match repo.object_find(&prefix, None, true) {
        Err(Error::AmbiguousReference { name, candidates }) => {
            assert_eq!(name, prefix);
            let mut candidates = candidates;
            candidates.sort_by_key(Digest::to_hex);
            assert_eq!(candidates, expected);
        }
        other => panic!("expected AmbiguousReference, got {other:?}"),
    }
}

#[test]
fn annotated_tags_dereference_to_their_target() {
    let (_guard, dir) = tempdir();
    let mut repo = init_repo(&dir);

    testfiles!(dir, ["file"]);
    repo.add(&[".".into()]).unwrap();
    let commit_id = repo.commit("msg").unwrap();
    let commit = repo.database.load(&commit_id).unwrap().into_commit().unwrap();

    let tag_id = repo.tag("v1.0.0", "HEAD", Some("first release")).unwrap();
    assert_ne!(tag_id, commit_id);

    let tag = match repo.database.load(&tag_id).unwrap() {
        Object::Tag(tag) => tag,
        other => panic!("expected a tag object, got a {}", other.kind()),
    };
    assert_eq!(tag.object_id().unwrap(), commit_id);
    assert_eq!(tag.name().unwrap(), "v1.0.0");

    // tag -> commit.
    assert_eq!(
        repo.object_find("v1.0.0", Some(ObjectKind::Commit), true)
            .unwrap()
            .unwrap(),
        commit_id
    );
    // tag -> commit -> tree.
    assert_eq!(
        repo.object_find("v1.0.0", Some(ObjectKind::Tree), true)
            .unwrap()
            .unwrap(),
        commit.tree_id().unwrap()
    );
    // Without follow, a kind mismatch is a clean "no match".
    assert_eq!(
        repo.object_find("v1.0.0", Some(ObjectKind::Commit), false)
            .unwrap(),
        None
    );
}

#[test]
fn lightweight_tags_point_straight_at_the_target() {
    let (_guard, dir) = tempdir();
    let mut repo = init_repo(&dir);

    testfiles!(dir, ["file"]);
    repo.add(&[".".into()]).unwrap();
    let commit_id = repo.commit("msg").unwrap();

    let tag_id = repo.tag("lightweight", "HEAD", None).unwrap();
    assert_eq!(tag_id, commit_id);
    assert_eq!(repo.resolve_name("lightweight").unwrap(), vec![commit_id]);

    assert!(matches!(
        repo.tag("bad..name", "HEAD", None),
        Err(Error::InvalidRefName(_))
    ));
}

#[test]
fn tag_chains_past_the_deref_limit_are_an_error() {
    let (_guard, dir) = tempdir();
    let mut repo = init_repo(&dir);
    set_author();

    testfiles!(dir, ["file"]);
    repo.add(&[".".into()]).unwrap();
    let commit_id = repo.commit("msg").unwrap();

    let tagger = Signature::from_env().unwrap();
    let mut target = commit_id.clone();
    let mut target_kind = ObjectKind::Commit;
    for i in 0..MAX_DEREF + 8 {
        let tag = Tag::new(
            target,
            target_kind,
            &format!("layer{i}"),
            tagger.clone(),
            "onion",
        );
        target = repo.database.store(&Object::Tag(tag)).unwrap();
        target_kind = ObjectKind::Tag;
    }
    repo.create_ref("tags/deep", &target).unwrap();

    assert!(matches!(
        repo.object_find("deep", Some(ObjectKind::Commit), true),
        Err(Error::DerefLimitExceeded(_, _))
    ));

    // A chain inside the limit still resolves.
    let mut shallow = commit_id.clone();
    for i in 0..3 {
        let tag = Tag::new(
            shallow,
            if i == 0 {
                ObjectKind::Commit
            } else {
                ObjectKind::Tag
            },
            &format!("shallow{i}"),
            tagger.clone(),
            "onion",
        );
        shallow = repo.database.store(&Object::Tag(tag)).unwrap();
    }
    repo.create_ref("tags/shallow", &shallow).unwrap();
    assert_eq!(
        repo.object_find("shallow", Some(ObjectKind::Commit), true)
            .unwrap()
            .unwrap(),
        commit_id
    );
}
