//! # certrust CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use certrust_cli::certificate::{run_certificate, CertificateArgs};
use certrust_cli::keys::{run_keys, run_provision, KeysArgs, ProvisionArgs};
use certrust_cli::signing::{
    run_canonicalize, run_credentials, run_sign, run_signatures, run_verify, CanonicalizeArgs,
    CredentialsArgs, SignArgs, SignaturesArgs, VerifyArgs,
};
use certrust_cli::Workspace;

/// Organization-signed certificates.
///
/// Manages RSA keys for a directory of organizations, signs and verifies
/// canonical JSON payloads and credential tuples, and records certificate
/// verification results.
#[derive(Parser, Debug)]
#[command(name = "certrust", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding keys, certificates and artifacts.
    #[arg(long, global = true, default_value = ".certrust")]
    data_dir: PathBuf,

    /// Organization directory file (JSON or YAML).
    #[arg(long, global = true, default_value = "organizations.json")]
    directory: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ensure every directory organization has a keypair.
    Provision(ProvisionArgs),

    /// Inspect organization keys.
    Keys(KeysArgs),

    /// Print the canonical encoding of a JSON document.
    Canonicalize(CanonicalizeArgs),

    /// Sign a document with an organization's key.
    Sign(SignArgs),

    /// Verify an organization's signature over a document.
    Verify(VerifyArgs),

    /// Sign or check `email\npassword` credential signatures.
    Credentials(CredentialsArgs),

    /// Export credential signatures for every eligible organization.
    Signatures(SignaturesArgs),

    /// Submit, re-verify and list certificates.
    Certificate(CertificateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ws = Workspace::new(cli.data_dir, cli.directory);
    tracing::debug!(data_dir = %ws.data_dir().display(), "certrust CLI starting");

    let result = match cli.command {
        Commands::Provision(args) => run_provision(&args, &ws),
        Commands::Keys(args) => run_keys(&args, &ws),
        Commands::Canonicalize(args) => run_canonicalize(&args),
        Commands::Sign(args) => run_sign(&args, &ws),
        Commands::Verify(args) => run_verify(&args, &ws),
        Commands::Credentials(args) => run_credentials(&args, &ws),
        Commands::Signatures(args) => run_signatures(&args, &ws),
        Commands::Certificate(args) => run_certificate(&args, &ws),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            // 1 is reserved for "signature did not verify".
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
