//! Command-line BLAKE3 hasher built on the [`b3`] crate.
//!
//! Reproduces the test-vector interface from the spec this binary exists to exercise: stdin (or
//! a file argument) is hashed, `--length` selects the number of output bytes, and `--keyed` /
//! `--derive-key` select the MAC / KDF modes. Output is lowercase hex followed by a newline.

mod error;

use crate::error::CliError;
use anyhow::Context;
use b3::{Hasher, KEY_LEN};
use clap::Parser;
use std::fs::File;
use std::io::{Read, Write, stdin, stdout};
use std::path::PathBuf;

/// Hash input with BLAKE3.
#[derive(Debug, Parser)]
#[clap(about, version)]
struct Args {
    /// File to hash; reads stdin when omitted
    file: Option<PathBuf>,
    /// Number of output bytes to print, in hexadecimal
    #[arg(long, default_value_t = 32)]
    length: u64,
    /// 64 hex digit (32 byte) key; selects the keyed hash (MAC) mode
    #[arg(long, value_name = "HEX64", conflicts_with = "derive_key")]
    keyed: Option<String>,
    /// Key-derivation context string; selects KDF mode
    #[arg(long, value_name = "CONTEXT", conflicts_with = "keyed")]
    derive_key: Option<String>,
}

fn parse_key_hex(hex_key: &str) -> Result<[u8; KEY_LEN], CliError> {
    if hex_key.len() != 2 * KEY_LEN {
        return Err(CliError::InvalidKeyHex {
            digits: hex_key.len(),
        });
    }
    let bytes = hex::decode(hex_key)?;
    Ok(bytes
        .try_into()
        .unwrap_or_else(|_| unreachable!("length checked above; qed")))
}

fn build_hasher(args: &Args) -> Result<Hasher, CliError> {
    match (&args.keyed, &args.derive_key) {
        (Some(hex_key), None) => {
            let key = parse_key_hex(hex_key)?;
            tracing::debug!("keyed hash mode selected");
            Ok(Hasher::new_keyed(&key))
        }
        (None, Some(context)) => {
            tracing::debug!(%context, "derive-key mode selected");
            Ok(Hasher::new_derive_key(context))
        }
        (None, None) => {
            tracing::debug!("unkeyed hash mode selected");
            Ok(Hasher::new())
        }
        (Some(_), Some(_)) => {
            unreachable!("clap's conflicts_with rules out --keyed with --derive-key")
        }
    }
}

fn read_input(file: Option<&PathBuf>) -> Result<Vec<u8>, CliError> {
    let mut buf = Vec::new();
    match file {
        Some(path) => {
            File::open(path)
                .and_then(|mut f| f.read_to_end(&mut buf))
                .map_err(|source| CliError::IoError {
                    path: path.clone(),
                    source,
                })?;
        }
        None => {
            stdin().lock().read_to_end(&mut buf).map_err(|source| {
                CliError::IoError {
                    path: PathBuf::from("<stdin>"),
                    source,
                }
            })?;
        }
    }
    Ok(buf)
}

pub fn main() -> anyhow::Result<()> {
    ab_cli_utils::set_exit_on_panic();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    tracing::trace!(?args, "parsed CLI arguments");

    let out_len =
        usize::try_from(args.length).map_err(|_| CliError::InvalidLengthArg(args.length))?;

    let mut hasher = build_hasher(&args)?;
    let input = read_input(args.file.as_ref())?;
    tracing::trace!(bytes = input.len(), "read input");
    hasher.update(&input);

    let mut out = vec![0u8; out_len];
    hasher.finalize(&mut out);

    writeln!(stdout().lock(), "{}", hex::encode(out)).context("failed to write output")?;
    Ok(())
}
