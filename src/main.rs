#[cfg(test)]
mod test;

mod cat_file;
mod database;
mod digest;
mod error;
mod filemode;
mod index;
mod interface;
mod kvlm;
mod lock;
mod object;
mod repo;
mod util;

use camino::Utf8PathBuf;
use clap::Parser;
use color_eyre::eyre::{eyre, Context};
use once_cell::sync::Lazy;
use tracing_subscriber::prelude::*;

use crate::interface::{Command, Opt};
use crate::repo::Repo;

static ARGS: Lazy<Opt> = Lazy::new(Opt::parse);

fn main() -> color_eyre::Result<()> {
    color_eyre::install().unwrap();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    Lazy::force(&ARGS);

    let path = match ARGS.path {
        Some(ref path) => path
            .canonicalize_utf8()
            .wrap_err(format!("Directory not found: '{path}'"))?,
        None => Utf8PathBuf::from_path_buf(std::env::current_dir()?)
            .map_err(|p| eyre!("Current directory is not valid UTF-8: {}", p.display()))?,
    };

    if matches!(ARGS.command, Command::Init) {
        Repo::init(&path)?;
        return Ok(());
    }

    let mut repo = Repo::discover(&path)?;

    match &ARGS.command {
        Command::Init => unreachable!(),
        Command::Add { paths } => {
            repo.add(paths)?;
        }
        Command::Rm { paths, cached } => {
            repo.rm(paths, *cached, false)?;
        }
        Command::Commit { message } => {
            let commit_id = repo.commit(message)?;
            println!("Created commit {}", commit_id.to_hex());
        }
        Command::Tag {
            name,
            target,
            message,
        } => {
            let oid = repo.tag(name, target, message.as_deref())?;
            println!("{}", oid.to_hex());
        }
        Command::Checkout { target, path } => {
            repo.checkout(target, path)?;
        }
        Command::CatFile(args) => {
            cat_file::handle(&repo, args)?;
        }
        Command::HashObject { kind, write, file } => {
            let data = std::fs::read(file).wrap_err(format!("Failed to read file: {file}"))?;
            let obj = object::Object::parse(*kind, &data)?;
            let oid = if *write {
                repo.database.store(&obj)?
            } else {
                database::hash_object(&obj)
            };
            println!("{}", oid.to_hex());
        }
        Command::RevParse { name, kind } => match repo.object_find(name, *kind, true)? {
            Some(oid) => println!("{}", oid.to_hex()),
            None => {
                eprintln!("'{name}' does not lead to an object of the requested type");
                std::process::exit(1);
            }
        },
    }
    Ok(())
}
