use camino::Utf8PathBuf;
use clap::Parser;
use clap::Subcommand;

use crate::object::ObjectKind;

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Initialise a new repository
    Init,

    /// Stage files or directories
    Add {
        #[clap(required = true)]
        paths: Vec<Utf8PathBuf>,
    },

    /// Unstage files, deleting them from the working tree as well
    Rm {
        #[clap(required = true)]
        paths: Vec<Utf8PathBuf>,

        /// Only remove the index entries, keeping the files
        #[clap(long)]
        cached: bool,
    },

    /// Record the staged tree as a new commit
    Commit {
        #[clap(short, long, env = "GRIT_COMMIT_MESSAGE")]
        message: String,
    },

    /// Create a tag pointing at an object
    Tag {
        name: String,

        #[clap(default_value = "HEAD")]
        target: String,

        /// Create an annotated tag object carrying this message
        #[clap(short, long)]
        message: Option<String>,
    },

    /// Materialize a commit's tree into an empty directory
    Checkout {
        target: String,
        path: Utf8PathBuf,
    },

    #[clap(subcommand)]
    CatFile(CatFile),

    /// Hash a file into an object, optionally writing it to the database
    HashObject {
        /// The object type to encode the file as
        #[clap(short = 't', long = "type", default_value = "blob")]
        kind: ObjectKind,

        /// Write the object to the database instead of only hashing it
        #[clap(short)]
        write: bool,

        file: Utf8PathBuf,
    },

    /// Resolve a name to an object id
    RevParse {
        name: String,

        /// Follow tags (and commits, when asking for a tree) until an object
        /// of this type is reached
        #[clap(short = 't', long = "type")]
        kind: Option<ObjectKind>,
    },
}

#[derive(Clone, Debug, Subcommand)]
pub enum CatFile {
    /// Exit with status `ExitCode::SUCCESS` if `object` exists and is a
    /// valid object, and `ExitCode::FAILURE` otherwise
    #[clap(short_flag = 'e')]
    Exists {
        #[clap(value_name = "object")]
        object: String,
    },

    /// Pretty-print the contents of `object` based on its type
    #[clap(short_flag = 'p')]
    PrettyPrint {
        #[clap(value_name = "object")]
        object: String,
    },

    /// Print the type of `object` to stdout
    #[clap(short_flag = 't')]
    Type {
        #[clap(value_name = "object")]
        object: String,
    },

    /// Print the payload size of `object` to stdout
    #[clap(short_flag = 's')]
    Size {
        #[clap(value_name = "object")]
        object: String,
    },
}

#[derive(Debug, Parser)]
pub struct Opt {
    #[clap(subcommand)]
    pub command: Command,

    /// The worktree path to operate on (defaults to the current directory)
    #[clap(short = 'C', long)]
    pub path: Option<Utf8PathBuf>,
}
