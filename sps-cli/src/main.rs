//! CLI for SPS blobs and wrapper-function calls.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::missing_docs_in_private_items
)]

mod schema;
mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde_json::Value;

use crate::schema::{Schema, Signature};

#[derive(Parser)]
#[command(name = "sps", version, about = "Simple Packed Serialization toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a JSON value under a tag and print the bytes as hex.
    ///
    /// Example: `sps encode 'tuple<u32, string>' '[7, "hi"]'`
    Encode {
        /// Tag expression, e.g. `map<string, seq<u64>>`.
        tag: Schema,
        /// JSON value to encode.
        json: String,
    },

    /// Decode hex bytes under a tag and print the value as JSON.
    Decode {
        /// Tag expression.
        tag: Schema,
        /// Hex-encoded bytes; whitespace is ignored.
        hex: String,
    },

    /// Serve the built-in demo wrapper functions on a Unix socket.
    Serve {
        /// Socket path.
        #[arg(long, env = "SPS_SOCKET")]
        socket: PathBuf,
    },

    /// Call a wrapper function on a running `sps serve`.
    ///
    /// Example: `sps call --tag 1 'expected<u64>(u64, u64)' 2 3`
    Call {
        /// Socket path.
        #[arg(long, env = "SPS_SOCKET")]
        socket: PathBuf,
        /// Function tag (decimal or `0x` hex).
        #[arg(long, value_parser = parse_fn_tag)]
        tag: u64,
        /// Signature, e.g. `string(string)`.
        signature: Signature,
        /// One JSON value per argument.
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Generate shell completion scripts.
    #[command(hide = true)]
    Completion {
        /// Target shell.
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = Cli::parse().dispatch() {
        eprintln!("sps: {e:#}");
        std::process::exit(1);
    }
}

impl Cli {
    fn dispatch(self) -> Result<()> {
        match self.command {
            Command::Encode { tag, json } => {
                let value: Value = serde_json::from_str(&json).context("invalid JSON")?;
                let bytes = tag.to_bytes(&value)?;
                println!("{}", hex::encode(bytes));
                Ok(())
            }
            Command::Decode { tag, hex } => {
                let bytes = parse_hex(&hex)?;
                let value = tag.from_bytes(&bytes)?;
                println!("{}", serde_json::to_string_pretty(&value)?);
                Ok(())
            }
            Command::Serve { socket } => serve_cmd(&socket),
            Command::Call {
                socket,
                tag,
                signature,
                args,
            } => call(&socket, tag, &signature, &args),
            Command::Completion { shell } => {
                clap_complete::generate(shell, &mut Self::command(), "sps", &mut std::io::stdout());
                Ok(())
            }
        }
    }
}

fn parse_fn_tag(s: &str) -> Result<u64, std::num::ParseIntError> {
    match s.strip_prefix("0x") {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => s.parse(),
    }
}

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(compact).context("invalid hex")
}

#[cfg(unix)]
fn serve_cmd(socket: &std::path::Path) -> Result<()> {
    serve::run(socket)
}

#[cfg(unix)]
fn call(socket: &std::path::Path, tag: u64, sig: &Signature, args: &[String]) -> Result<()> {
    use sps_wrapper::{Dispatch, FnTag, StreamClient};

    let values = args
        .iter()
        .enumerate()
        .map(|(i, a)| serde_json::from_str(a).with_context(|| format!("argument {i}: invalid JSON")))
        .collect::<Result<Vec<Value>>>()?;
    let arg_bytes = sig.encode_args(&values)?;

    let client = StreamClient::connect(socket)
        .with_context(|| format!("failed to connect to {}", socket.display()))?;
    let result = client.dispatch(FnTag(tag), &arg_bytes);
    if let Some(msg) = result.out_of_band_error() {
        anyhow::bail!("{sig} failed: {}", msg.to_string_lossy());
    }
    let value = sig
        .ret
        .from_bytes(result.data())
        .with_context(|| format!("decoding {} result", sig.ret))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[cfg(not(unix))]
fn serve_cmd(_socket: &std::path::Path) -> Result<()> {
    anyhow::bail!("`sps serve` requires Unix domain sockets")
}

#[cfg(not(unix))]
fn call(_socket: &std::path::Path, _tag: u64, _sig: &Signature, _args: &[String]) -> Result<()> {
    anyhow::bail!("`sps call` requires Unix domain sockets")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fn_tags_accept_hex() {
        assert_eq!(parse_fn_tag("0x10").unwrap(), 16);
        assert_eq!(parse_fn_tag("42").unwrap(), 42);
        assert!(parse_fn_tag("x").is_err());
    }

    #[test]
    fn hex_ignores_whitespace() {
        assert_eq!(parse_hex("0a 0B\n ff").unwrap(), [0x0a, 0x0b, 0xff]);
        assert!(parse_hex("abc").is_err());
    }

    #[test]
    fn parses_call_arguments() {
        let cli = Cli::try_parse_from([
            "sps",
            "call",
            "--socket",
            "/tmp/sps.sock",
            "--tag",
            "0x2",
            "string(string)",
            "\"hi\"",
        ])
        .unwrap();
        match cli.command {
            Command::Call {
                tag, signature, args, ..
            } => {
                assert_eq!(tag, 2);
                assert_eq!(signature.to_string(), "string(string)");
                assert_eq!(args, ["\"hi\""]);
            }
            _ => panic!("expected call"),
        }
    }
}
