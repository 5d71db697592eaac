//! # Key Subcommands
//!
//! `certrust provision` runs the idempotent issuance pass over the whole
//! directory. `certrust keys show` prints an organization's public key.
//! Nothing else in the CLI generates keys.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use certrust_crypto::DEFAULT_MODULUS_BITS;
use certrust_keys::RegistryConfig;

use crate::{organization_ref, Workspace};

/// Arguments for `certrust provision`.
#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// RSA modulus size for newly generated keys (minimum 2048).
    #[arg(long, default_value_t = DEFAULT_MODULUS_BITS)]
    pub modulus_bits: usize,
}

/// Arguments for `certrust keys`.
#[derive(Args, Debug)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub command: KeysCommand,
}

#[derive(Subcommand, Debug)]
pub enum KeysCommand {
    /// Print an organization's public key (SPKI PEM).
    Show {
        /// Organization code or name.
        #[arg(value_name = "ORG")]
        org: String,
    },
}

/// Ensure a keypair for every directory row.
pub fn run_provision(args: &ProvisionArgs, ws: &Workspace) -> Result<u8> {
    let config = RegistryConfig::new(args.modulus_bits).context("invalid --modulus-bits")?;
    let registry = ws.registry(config)?;
    let report = registry
        .provision_all()
        .context("failed to provision organization keys")?;

    for org in &report.generated {
        println!("generated       {org}");
    }
    for org in &report.already_present {
        println!("already present {org}");
    }
    println!(
        "OK: {} organizations ({} generated)",
        report.total(),
        report.generated.len()
    );
    Ok(0)
}

pub fn run_keys(args: &KeysArgs, ws: &Workspace) -> Result<u8> {
    match &args.command {
        KeysCommand::Show { org } => {
            let registry = ws.registry(RegistryConfig::default())?;
            let keys = registry
                .get_keys(&organization_ref(org)?)
                .with_context(|| format!("no keypair for {org:?}; run `certrust provision`"))?;
            print!("{}", keys.public_key_pem);
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::workspace;

    #[test]
    fn provision_then_show() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = workspace(tmp.path());
        let args = ProvisionArgs {
            modulus_bits: DEFAULT_MODULUS_BITS,
        };
        assert_eq!(run_provision(&args, &ws).unwrap(), 0);
        assert_eq!(std::fs::read_dir(ws.keys_dir()).unwrap().count(), 2);

        // Second pass is a no-op.
        assert_eq!(run_provision(&args, &ws).unwrap(), 0);
        assert_eq!(std::fs::read_dir(ws.keys_dir()).unwrap().count(), 2);

        let show = KeysArgs {
            command: KeysCommand::Show {
                org: "acme corp".into(),
            },
        };
        assert_eq!(run_keys(&show, &ws).unwrap(), 0);
    }

    #[test]
    fn provision_rejects_small_modulus() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = workspace(tmp.path());
        let args = ProvisionArgs { modulus_bits: 1024 };
        assert!(run_provision(&args, &ws).is_err());
        assert!(!ws.keys_dir().exists());
    }

    #[test]
    fn show_without_keys_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = workspace(tmp.path());
        let show = KeysArgs {
            command: KeysCommand::Show {
                org: "ACME-001".into(),
            },
        };
        let err = run_keys(&show, &ws).unwrap_err();
        assert!(format!("{err:#}").contains("certrust provision"));
    }
}
