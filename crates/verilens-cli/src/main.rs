// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verilens — capture authenticity verification from the command line.
//
// Entry point. Initialises logging and configuration, then dispatches to the
// subcommand. Reports go to stdout as JSON; logs go to stderr.

mod commands;
mod request;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use verilens_core::config;
use verilens_core::error::VerilensError;
use verilens_core::error_codes::normalize_error;
use verilens_core::types::HashAlgorithm;

use commands::VerifyArgs;

/// Exit status when the command itself could not run.
const EXIT_ERROR: u8 = 3;

/// verilens - verify that a capture is authentic
#[derive(Parser, Debug)]
#[command(name = "verilens")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding default.json and <env>.json (overrides VERILENS_CONFIG_DIR)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Configuration environment (overrides VERILENS_ENV)
    #[arg(long, global = true)]
    env: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a capture described by a JSON request; exits 0 pass, 1 suspect, 2 fail
    Verify {
        /// Path to the JSON request
        #[arg(long)]
        request: PathBuf,
        /// Image file (overrides "image" in the request)
        #[arg(long)]
        image: Option<PathBuf>,
        /// Record the outcome in this SQLite audit database
        #[arg(long)]
        audit_db: Option<PathBuf>,
    },

    /// Print the digest of a file
    Hash {
        path: PathBuf,
        /// Digest algorithm (defaults to integrity.default_algorithm)
        #[arg(long)]
        algorithm: Option<HashAlgorithm>,
    },

    /// Encrypt a file into an AES-256-GCM JSON envelope
    Seal {
        input: PathBuf,
        output: PathBuf,
        /// 32-byte data key, hex-encoded
        #[arg(long)]
        key_hex: String,
    },

    /// Decrypt an envelope produced by `seal`
    Open {
        input: PathBuf,
        output: PathBuf,
        /// 32-byte data key, hex-encoded
        #[arg(long)]
        key_hex: String,
    },

    /// Sign a capture with a fresh device key and print its binding and ledger receipt
    Sign {
        path: PathBuf,
        #[arg(long, default_value = "verilens-cli")]
        signer_id: String,
        #[arg(long, default_value = "verilens-local")]
        chain_id: String,
        /// Digest algorithm (defaults to integrity.default_algorithm)
        #[arg(long)]
        algorithm: Option<HashAlgorithm>,
    },

    /// List recorded verifications
    Audit {
        /// SQLite audit database
        #[arg(long)]
        db: PathBuf,
        /// Only runs for this image digest
        #[arg(long)]
        hash: Option<String>,
        /// Number of most recent runs to show
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            let normalized = normalize_error(&e);
            match serde_json::to_string(&normalized) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{e}"),
            }
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn run(cli: Cli) -> Result<u8, VerilensError> {
    let config = config::init_global(commands::load_config(cli.config_dir, cli.env)?)?;

    match cli.command {
        Command::Verify {
            request,
            image,
            audit_db,
        } => {
            let report = commands::verify(
                VerifyArgs {
                    request,
                    image,
                    audit_db,
                },
                config,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(commands::verdict_exit_code(report.verdict))
        }
        Command::Hash { path, algorithm } => {
            let algorithm = algorithm.unwrap_or(config.integrity.default_algorithm);
            println!("{}", commands::hash(&path, algorithm).await?);
            Ok(0)
        }
        Command::Seal {
            input,
            output,
            key_hex,
        } => {
            commands::seal(&input, &output, &key_hex, config).await?;
            Ok(0)
        }
        Command::Open {
            input,
            output,
            key_hex,
        } => {
            commands::open(&input, &output, &key_hex, config).await?;
            Ok(0)
        }
        Command::Sign {
            path,
            signer_id,
            chain_id,
            algorithm,
        } => {
            let algorithm = algorithm.unwrap_or(config.integrity.default_algorithm);
            let out = commands::sign(&path, &signer_id, &chain_id, algorithm).await?;
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(0)
        }
        Command::Audit { db, hash, limit } => {
            let entries = commands::audit(&db, hash.as_deref(), limit)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_verify_with_global_flags() {
        let cli = Cli::try_parse_from([
            "verilens",
            "verify",
            "--request",
            "req.json",
            "--env",
            "staging",
            "--audit-db",
            "audit.db",
        ])
        .unwrap();
        assert_eq!(cli.env.as_deref(), Some("staging"));
        assert!(matches!(cli.command, Command::Verify { audit_db: Some(_), .. }));
    }

    #[test]
    fn unknown_hash_algorithm_is_rejected() {
        assert!(Cli::try_parse_from(["verilens", "hash", "f", "--algorithm", "md5"]).is_err());
        let cli = Cli::try_parse_from(["verilens", "hash", "f", "--algorithm", "SHA-512"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Hash {
                algorithm: Some(HashAlgorithm::Sha512),
                ..
            }
        ));
    }

    #[test]
    fn omitted_algorithm_is_left_to_configuration() {
        let cli = Cli::try_parse_from(["verilens", "sign", "capture.png"]).unwrap();
        assert!(matches!(cli.command, Command::Sign { algorithm: None, .. }));
    }
}
