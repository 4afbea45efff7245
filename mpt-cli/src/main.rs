//! # mpt CLI
//!
//! Command-line interface for a Merkle Patricia Trie kept in a state file.
//!
//! Usage:
//!   mpt set <key> <value>
//!   mpt get <key>
//!   mpt root
//!   mpt prove <key> > proof.json
//!   mpt verify --root <hash> --proof proof.json [--expect <value> | --absent]
//!
//! Keys and values prefixed with `0x` are read as hex, anything else as UTF-8.
//!
//! Examples:
//!   mpt set dog puppy
//!   mpt --db accounts.json set 0xdeadbeef 0x01
//!   mpt -v prove dog

mod store;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use alloy_primitives::B256;
use clap::{ArgAction, Parser, Subcommand};
use mpt_error::{Error, Result};
use mpt_trie::{generate_proof, verify_proof, ExpectedValue, Proof};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::store::StateStore;

#[derive(Parser)]
#[command(name = "mpt")]
#[command(author, version, about = "Merkle Patricia Trie with verifiable proofs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// State file holding the current root and all trie nodes
    #[arg(long, global = true, default_value = "mpt-state.json")]
    db: PathBuf,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert or update a key
    Set {
        key: String,
        value: String,
    },
    /// Print the value stored under a key
    Get {
        key: String,
    },
    /// Print the current root hash
    Root,
    /// Print a JSON proof for a key
    Prove {
        key: String,
    },
    /// Check a JSON proof against a root hash
    Verify {
        /// Root hash the proof must commit to
        #[arg(long)]
        root: String,

        /// Proof file written by `prove`
        #[arg(long)]
        proof: PathBuf,

        /// Require this value instead of the one recorded in the proof
        #[arg(long, conflicts_with = "absent")]
        expect: Option<String>,

        /// Require the key to be absent
        #[arg(long)]
        absent: bool,
    },
}

/// `0x`-prefixed input is hex, anything else is taken as UTF-8 bytes
fn parse_bytes(input: &str) -> Result<Vec<u8>> {
    match input.strip_prefix("0x") {
        Some(hex_str) => hex::decode(hex_str).map_err(|e| {
            Error::invalid_argument(format!("invalid hex '{}'", input))
                .with_operation("cli::parse")
                .set_source(e)
        }),
        None => Ok(input.as_bytes().to_vec()),
    }
}

/// Printable form of a value: UTF-8 text when possible, hex otherwise
fn display_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => format!("0x{}", hex::encode(bytes)),
    }
}

fn parse_root(input: &str) -> Result<B256> {
    input.parse().map_err(|e| {
        Error::invalid_argument(format!("invalid root hash '{}'", input))
            .with_operation("cli::parse")
            .set_source(e)
    })
}

fn read_proof(path: &Path) -> Result<Proof> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::from(e)
            .with_operation("cli::verify")
            .with_context("path", path.display().to_string())
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::parse_failed(format!("invalid proof file: {}", e))
            .with_operation("cli::verify")
            .set_source(e)
    })
}

fn run(cli: Cli) -> Result<()> {
    let store = StateStore::new(&cli.db);

    match cli.command {
        Commands::Set { key, value } => {
            let mut trie = store.load()?;
            let root = trie.insert(&parse_bytes(&key)?, parse_bytes(&value)?)?;
            store.save(&trie)?;
            info!(%root, db = %store.path().display(), "Updated trie");
            println!("{}", root);
        }
        Commands::Get { key } => {
            let trie = store.load()?;
            match trie.get(&parse_bytes(&key)?)? {
                Some(value) => println!("{}", display_bytes(&value)),
                None => {
                    return Err(Error::invalid_argument(format!("key '{}' not found", key))
                        .with_operation("cli::get"))
                }
            }
        }
        Commands::Root => {
            let trie = store.load()?;
            println!("{}", trie.root_hash());
        }
        Commands::Prove { key } => {
            let trie = store.load()?;
            let proof = generate_proof(&trie, &parse_bytes(&key)?)?;
            let json = serde_json::to_string_pretty(&proof).map_err(|e| {
                Error::serialization_failed(e.to_string())
                    .with_operation("cli::prove")
                    .set_source(e)
            })?;
            println!("{}", json);
        }
        Commands::Verify {
            root,
            proof,
            expect,
            absent,
        } => {
            let root = parse_root(&root)?;
            let proof = read_proof(&proof)?;

            let expect = expect.as_deref().map(parse_bytes).transpose()?;
            let expected = if absent {
                ExpectedValue::Absent
            } else if let Some(value) = expect.as_deref() {
                ExpectedValue::Value(value)
            } else {
                ExpectedValue::from(proof.value.as_ref().map(|value| &value[..]))
            };

            match verify_proof(root, &proof.key, &proof.nodes, expected)? {
                Some(value) => println!("valid: {}", display_bytes(&value)),
                None => println!("valid: key absent"),
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
