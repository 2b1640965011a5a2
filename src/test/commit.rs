use pretty_assertions::assert_eq;

use crate::database::hash_object;
use crate::index::Index;
use crate::object::{Blob, Object, ObjectKind};
use crate::test::{contents_of, init_repo, tempdir, COMMIT_EMAIL, COMMIT_NAME};
use crate::testfiles;

#[test]
fn commit_builds_the_tree_hierarchy() {
    let (_guard, dir) = tempdir();
    let mut repo = init_repo(&dir);

    testfiles!(dir, ["a.txt", "dir/b.txt"]);
    repo.add(&[".".into()]).unwrap();

    let commit_id = repo.commit("initial").unwrap();

    // HEAD reaches the commit through refs/heads/master.
    assert_eq!(
        repo.resolve_ref("HEAD".into()).unwrap().unwrap(),
        commit_id
    );

    let commit = repo.database.load(&commit_id).unwrap().into_commit().unwrap();
    assert_eq!(commit.message(), "initial\n");
    assert!(commit.parents().unwrap().is_empty());
    let author = commit.author().unwrap().to_string();
    assert!(author.starts_with(&format!("{COMMIT_NAME} <{COMMIT_EMAIL}> ")));

    // Root tree: a blob entry for a.txt and a tree entry for dir.
    let root = repo
        .database
        .load(&commit.tree_id().unwrap())
        .unwrap()
        .into_tree()
        .unwrap();
    let names: Vec<_> = root.entries().iter().map(|e| e.name()).collect();
    assert_eq!(names, ["a.txt", "dir"]);
    assert!(!root.entries()[0].is_tree());
    assert!(root.entries()[1].is_tree());

    let sha_a = hash_object(&Object::Blob(Blob::new(contents_of("a.txt"))));
    assert_eq!(root.entries()[0].oid(), &sha_a);

    // The dir subtree holds exactly one blob entry, b.txt.
    let subtree = repo
        .database
        .load(root.entries()[1].oid())
        .unwrap()
        .into_tree()
        .unwrap();
    let sha_b = hash_object(&Object::Blob(Blob::new(contents_of("dir/b.txt"))));
    assert_eq!(subtree.entries().len(), 1);
    assert_eq!(subtree.entries()[0].name(), "b.txt");
    assert_eq!(subtree.entries()[0].oid(), &sha_b);
    assert!(!subtree.entries()[0].is_tree());
}

#[test]
fn second_commit_records_its_parent() {
    let (_guard, dir) = tempdir();
    let mut repo = init_repo(&dir);

    testfiles!(dir, ["one"]);
    repo.add(&[".".into()]).unwrap();
    let first = repo.commit("one").unwrap();

    testfiles!(dir, ["two"]);
    repo.add(&[".".into()]).unwrap();
    let second = repo.commit("two").unwrap();

    let commit = repo.database.load(&second).unwrap().into_commit().unwrap();
    assert_eq!(commit.parents().unwrap(), vec![first]);
    assert_eq!(repo.resolve_ref("HEAD".into()).unwrap().unwrap(), second);
}

#[test]
fn empty_index_produces_the_empty_tree() {
    let (_guard, dir) = tempdir();
    let repo = init_repo(&dir);

    let oid = repo.tree_from_index(&Index::default()).unwrap();
    // The well-known id of the empty tree.
    assert_eq!(oid.to_hex(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    assert!(repo.database.contains(&oid));
}

#[test]
fn directory_registered_for_deeply_nested_file_only() {
    let (_guard, dir) = tempdir();
    let mut repo = init_repo(&dir);

    // Every ancestor of the single file needs its own tree.
    testfiles!(dir, ["a/b/c/deep.txt"]);
    repo.add(&[".".into()]).unwrap();

    let commit_id = repo.commit("deep").unwrap();
    let commit = repo.database.load(&commit_id).unwrap().into_commit().unwrap();

    let mut tree = repo
        .database
        .load(&commit.tree_id().unwrap())
        .unwrap()
        .into_tree()
        .unwrap();
    for expected in ["a", "b", "c"] {
        assert_eq!(tree.entries().len(), 1);
        assert_eq!(tree.entries()[0].name(), expected);
        assert!(tree.entries()[0].is_tree());
        tree = repo
            .database
            .load(tree.entries()[0].oid())
            .unwrap()
            .into_tree()
            .unwrap();
    }
    assert_eq!(tree.entries()[0].name(), "deep.txt");
}

#[test]
fn checkout_materializes_the_committed_tree() {
    let (_guard, dir) = tempdir();
    let mut repo = init_repo(&dir);

    testfiles!(dir, ["top.txt", "nested/inner/file.txt"]);
    repo.add(&[".".into()]).unwrap();
    let commit_id = repo.commit("snapshot").unwrap();

    let target = dir.join("checkout-target");
    repo.checkout(&commit_id.to_hex(), &target).unwrap();

    assert_eq!(
        std::fs::read(target.join("top.txt")).unwrap(),
        contents_of("top.txt")
    );
    assert_eq!(
        std::fs::read(target.join("nested/inner/file.txt")).unwrap(),
        contents_of("nested/inner/file.txt")
    );

    // A non-empty target is refused.
    assert!(repo.checkout(&commit_id.to_hex(), &target).is_err());
}

#[test]
fn object_find_resolves_head_to_the_tree() {
    let (_guard, dir) = tempdir();
    let mut repo = init_repo(&dir);

    testfiles!(dir, ["file"]);
    repo.add(&[".".into()]).unwrap();
    let commit_id = repo.commit("msg").unwrap();
    let commit = repo.database.load(&commit_id).unwrap().into_commit().unwrap();

    let found = repo
        .object_find("HEAD", Some(ObjectKind::Tree), true)
        .unwrap()
        .unwrap();
    assert_eq!(found, commit.tree_id().unwrap());
}
