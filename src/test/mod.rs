mod commit;
mod refs;

use camino::{Utf8Path, Utf8PathBuf};
use tempdir::TempDir;

use crate::repo::Repo;

pub const COMMIT_NAME: &str = "Test Author";
pub const COMMIT_EMAIL: &str = "author@example.com";

/// Create the files named in the list under `root`, with per-file contents
/// `"<path>-contents\n"`.
#[macro_export]
macro_rules! testfiles {
    ($root:expr, [$($path:expr),* $(,)?]) => {{
        use std::io::Write;
        $({
            let path = $root.join($path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            writeln!(std::fs::File::create(&path).unwrap(), "{}-contents", $path).unwrap();
        })*
    }};
}

/// The contents `testfiles!` writes for a path.
pub fn contents_of(path: &str) -> Vec<u8> {
    format!("{path}-contents\n").into_bytes()
}

pub fn set_author() {
    std::env::set_var("GRIT_AUTHOR_NAME", COMMIT_NAME);
    std::env::set_var("GRIT_AUTHOR_EMAIL", COMMIT_EMAIL);
}

pub fn tempdir() -> (TempDir, Utf8PathBuf) {
    let dir = TempDir::new("grit-test").unwrap();
    let path = Utf8Path::from_path(dir.path()).unwrap().to_owned();
    (dir, path)
}

pub fn init_repo(dir: &Utf8Path) -> Repo {
    set_author();
    Repo::init(dir).unwrap();
    Repo::open(dir.to_owned()).unwrap()
}
