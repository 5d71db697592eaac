//! # Signing Subcommands
//!
//! RSASSA-PKCS1-v1_5 / SHA-256 signing with organization keys held in the
//! data directory. Signatures are printed and read as standard base64.
//!
//! `sign` and `verify` canonicalize a JSON document unless `--raw` is given,
//! in which case the file bytes are signed as-is. Verification exits 0 on
//! a valid signature and 1 otherwise.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use zeroize::Zeroizing;

use certrust_core::CanonicalBytes;
use certrust_keys::{
    CredentialMessage, CredentialSignatureExport, RegistryConfig, SigningService,
    VerificationService,
};

use crate::{organization_ref, read_json, Workspace};

/// Arguments for `certrust canonicalize`.
#[derive(Args, Debug)]
pub struct CanonicalizeArgs {
    /// JSON document to encode.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Arguments for `certrust sign`.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Organization code or name.
    #[arg(long)]
    pub org: String,
    /// Sign the file bytes instead of the canonical JSON encoding.
    #[arg(long)]
    pub raw: bool,
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Arguments for `certrust verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Organization code or name.
    #[arg(long)]
    pub org: String,
    /// Base64 signature.
    #[arg(long)]
    pub signature: String,
    /// Verify over the file bytes instead of the canonical JSON encoding.
    #[arg(long)]
    pub raw: bool,
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Arguments for `certrust credentials`.
#[derive(Args, Debug)]
pub struct CredentialsArgs {
    #[command(subcommand)]
    pub command: CredentialsCommand,
}

#[derive(Subcommand, Debug)]
pub enum CredentialsCommand {
    /// Sign `email\npassword` with an organization's key.
    Sign {
        #[arg(long)]
        org: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Check a credential signature.
    Verify {
        #[arg(long)]
        org: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        signature: String,
    },
}

/// Arguments for `certrust signatures`.
#[derive(Args, Debug)]
pub struct SignaturesArgs {
    #[command(subcommand)]
    pub command: SignaturesCommand,
}

#[derive(Subcommand, Debug)]
pub enum SignaturesCommand {
    /// Sign a credential tuple with every eligible organization's key.
    Generate {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Write to a file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Lines,
}

fn services(ws: &Workspace) -> Result<(SigningService, VerificationService)> {
    let registry = ws.registry(RegistryConfig::default())?;
    Ok((
        SigningService::new(registry.clone()),
        VerificationService::new(registry),
    ))
}

fn message_bytes(file: &Path, raw: bool) -> Result<Vec<u8>> {
    if raw {
        return std::fs::read(file)
            .with_context(|| format!("failed to read file: {}", file.display()));
    }
    let value = read_json(file)?;
    let canonical = CanonicalBytes::new(&value).context("failed to canonicalize document")?;
    Ok(canonical.into_bytes())
}

pub fn run_canonicalize(args: &CanonicalizeArgs) -> Result<u8> {
    let value = read_json(&args.file)?;
    let canonical = CanonicalBytes::new(&value).context("failed to canonicalize document")?;
    println!("{}", canonical.as_str());
    Ok(0)
}

pub fn run_sign(args: &SignArgs, ws: &Workspace) -> Result<u8> {
    let (signer, _) = services(ws)?;
    let bytes = message_bytes(&args.file, args.raw)?;
    let signature = signer
        .sign(&organization_ref(&args.org)?, &bytes)
        .with_context(|| format!("failed to sign for {:?}", args.org))?;
    println!("{}", signature.to_base64());
    Ok(0)
}

pub fn run_verify(args: &VerifyArgs, ws: &Workspace) -> Result<u8> {
    let (_, verifier) = services(ws)?;
    let bytes = message_bytes(&args.file, args.raw)?;
    let outcome = verifier.check_base64(&organization_ref(&args.org)?, &bytes, &args.signature);
    report(outcome)
}

fn report(outcome: certrust_keys::VerificationOutcome) -> Result<u8> {
    if outcome.is_valid() {
        println!("OK: signature is valid");
        Ok(0)
    } else {
        println!("FAIL: signature verification failed: {outcome}");
        Ok(1)
    }
}

pub fn run_credentials(args: &CredentialsArgs, ws: &Workspace) -> Result<u8> {
    let (signer, verifier) = services(ws)?;
    match &args.command {
        CredentialsCommand::Sign {
            org,
            email,
            password,
        } => {
            let password = Zeroizing::new(password.clone());
            let message = CredentialMessage::new(email, &password);
            let signature = signer
                .sign_credentials(&organization_ref(org)?, &message)
                .with_context(|| format!("failed to sign credentials for {org:?}"))?;
            println!("{}", signature.to_base64());
            Ok(0)
        }
        CredentialsCommand::Verify {
            org,
            email,
            password,
            signature,
        } => {
            let password = Zeroizing::new(password.clone());
            let message = CredentialMessage::new(email, &password);
            report(verifier.check_credentials(&organization_ref(org)?, &message, signature))
        }
    }
}

pub fn run_signatures(args: &SignaturesArgs, ws: &Workspace) -> Result<u8> {
    match &args.command {
        SignaturesCommand::Generate {
            email,
            password,
            format,
            output,
        } => {
            let (signer, _) = services(ws)?;
            let password = Zeroizing::new(password.clone());
            let message = CredentialMessage::new(email, &password);
            let export = CredentialSignatureExport::generate(
                &signer,
                signer.registry().directory(),
                &message,
            )
            .context("failed to generate credential signatures")?;
            let body = match format {
                ExportFormat::Json => export.to_json_pretty()?,
                ExportFormat::Lines => export.to_lines(),
            };
            match output {
                Some(path) => {
                    std::fs::write(path, format!("{body}\n"))
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("OK: wrote {} signatures to {}", export.items.len(), path.display());
                }
                None => println!("{body}"),
            }
            Ok(0)
        }
    }
}
