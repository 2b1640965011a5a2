use std::io::Write;
use std::process::exit;

use crate::interface::CatFile;
use crate::object::Object;
use crate::repo::Repo;

pub fn handle(repo: &Repo, args: &CatFile) -> color_eyre::Result<()> {
    match args {
        CatFile::Exists { object } => {
            let loadable = repo
                .object_find(object, None, true)
                .and_then(|oid| repo.database.load(&oid.expect("no wanted kind")));
            match loadable {
                Ok(_) => Ok(()),
                Err(e) => {
                    eprintln!("{e}");
                    exit(1);
                }
            }
        }

        CatFile::PrettyPrint { object } => {
            let oid = repo
                .object_find(object, None, true)?
                .expect("no wanted kind");
            pretty_print(&repo.database.load(&oid)?)
        }

        CatFile::Type { object } => {
            let oid = repo
                .object_find(object, None, true)?
                .expect("no wanted kind");
            println!("{}", repo.database.load(&oid)?.kind());
            Ok(())
        }

        CatFile::Size { object } => {
            let oid = repo
                .object_find(object, None, true)?
                .expect("no wanted kind");
            println!("{}", repo.database.load(&oid)?.serialize().len());
            Ok(())
        }
    }
}

fn pretty_print(obj: &Object) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    match obj {
        Object::Blob(blob) => stdout.lock().write_all(blob.data())?,
        Object::Commit(commit) => stdout.lock().write_all(&commit.serialize())?,
        Object::Tag(tag) => stdout.lock().write_all(&tag.serialize())?,
        Object::Tree(tree) => {
            for entry in tree.entries() {
                let kind = if entry.is_tree() { "tree" } else { "blob" };
                println!(
                    "{} {} {}\t{}",
                    std::str::from_utf8(entry.mode_bytes()).expect("modes are ASCII octal"),
                    kind,
                    entry.oid().to_hex(),
                    entry.name()
                );
            }
        }
    }
    Ok(())
}
