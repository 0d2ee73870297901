#![cfg(feature = "cli")]

//! A small demo driver over a single tree backed by an in-process
//! `MemStore` (`spec.md` §1: argument parsing and a CLI are explicitly
//! out of core scope — this binary is ambient demo tooling, gated
//! behind the `cli` feature the way the teacher gates its own
//! `src/bin/cli.rs`).

use std::error::Error;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rgw_bplus::{flags, MemStore, Tree, TreeConfig};

#[derive(Parser)]
#[command(
    name = "rgw-bplus-cli",
    about = "Insert, remove, and list keys in a demo tree"
)]
struct Cli {
    /// Name of the tree; node names are derived from it.
    #[arg(long, default_value = "demo")]
    tree: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Insert {
        key: String,
        value: String,
    },
    Remove {
        key: String,
    },
    List {
        #[arg(long)]
        prefix: Option<String>,
    },
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let tree = Tree::new(&cli.tree, TreeConfig::default(), Arc::new(MemStore::new()));

    match cli.command {
        Command::Insert { key, value } => {
            tree.insert(key.clone(), value)?;
            println!("inserted {key:?}");
        }
        Command::Remove { key } => {
            tree.remove(key.clone())?;
            println!("removed {key:?}");
        }
        Command::List { prefix } => {
            let mut count = 0u32;
            let scan_flags = if prefix.is_some() {
                flags::REQUIRE_PREFIX
            } else {
                flags::NONE
            };
            tree.list(
                prefix.as_deref().map(str::as_bytes),
                |k, v| {
                    count += 1;
                    println!(
                        "{} = {}",
                        String::from_utf8_lossy(k),
                        String::from_utf8_lossy(v)
                    );
                    flags::NONE
                },
                None,
                scan_flags,
            )?;
            println!("{count} entries");
        }
    }
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        process::exit(1);
    }
}
