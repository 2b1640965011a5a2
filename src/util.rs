use rand::distributions::Alphanumeric;
use rand::prelude::*;

/// A random name for an in-flight temporary file, renamed into place once
/// fully written.
pub fn tmp_file_name() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6).map(|_| rng.sample(Alphanumeric) as char).collect();
    format!("tmp_obj_{suffix}")
}
