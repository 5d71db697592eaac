//! # Certificate Subcommands
//!
//! Submit a signed payload, re-verify a stored record, and list a
//! subject's records. Records are printed as pretty JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use certrust_core::{CertificateId, SubjectId};
use certrust_trust::PayloadSubmission;

use crate::{organization_ref, read_json, Workspace};

/// Arguments for `certrust certificate`.
#[derive(Args, Debug)]
pub struct CertificateArgs {
    #[command(subcommand)]
    pub command: CertificateCommand,
}

#[derive(Subcommand, Debug)]
pub enum CertificateCommand {
    /// Verify a signed JSON payload and record the result.
    Submit {
        #[arg(long)]
        subject: String,
        /// Issuing organization code or name.
        #[arg(long)]
        org: String,
        #[arg(long)]
        course: String,
        /// JSON payload file.
        #[arg(long)]
        payload: PathBuf,
        /// Base64 signature over the canonical payload.
        #[arg(long)]
        signature: String,
        /// Archive the canonical payload bytes.
        #[arg(long)]
        archive: bool,
    },
    /// Re-verify a stored certificate. Exits 1 if it does not verify.
    Verify {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// List a subject's certificates, newest first.
    List {
        #[arg(long)]
        subject: String,
    },
}

pub fn run_certificate(args: &CertificateArgs, ws: &Workspace) -> Result<u8> {
    let service = ws.trust_service()?;
    match &args.command {
        CertificateCommand::Submit {
            subject,
            org,
            course,
            payload,
            signature,
            archive,
        } => {
            let submission = PayloadSubmission {
                subject: SubjectId::new(subject).context("invalid --subject")?,
                organization: organization_ref(org)?,
                course: course.clone(),
                payload: read_json(payload)?,
                signature: signature.clone(),
                archive: *archive,
            };
            let result = service
                .submit_signed_payload(submission)
                .context("certificate submission failed")?;
            println!("{}", serde_json::to_string_pretty(&result.record)?);
            tracing::info!(outcome = %result.outcome, "submission recorded");
            Ok(0)
        }
        CertificateCommand::Verify { id } => {
            let id = CertificateId::parse(id).context("invalid certificate id")?;
            let result = service.reverify(id).context("re-verification failed")?;
            println!("{}", serde_json::to_string_pretty(&result.record)?);
            if result.outcome.is_valid() {
                Ok(0)
            } else {
                eprintln!("FAIL: {}", result.outcome);
                Ok(1)
            }
        }
        CertificateCommand::List { subject } => {
            let subject = SubjectId::new(subject).context("invalid --subject")?;
            let records = service.certificates_for(&subject)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{run_provision, ProvisionArgs};
    use crate::test_support::workspace;
    use certrust_core::CanonicalBytes;
    use certrust_crypto::DEFAULT_MODULUS_BITS;
    use serde_json::json;

    #[test]
    fn submit_reverify_and_list() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = workspace(tmp.path());
        run_provision(
            &ProvisionArgs {
                modulus_bits: DEFAULT_MODULUS_BITS,
            },
            &ws,
        )
        .unwrap();

        let payload = json!({"course": "X", "grade": "A"});
        let payload_path = tmp.path().join("payload.json");
        std::fs::write(&payload_path, payload.to_string()).unwrap();
        let service = ws.trust_service().unwrap();
        let signature = service
            .signer()
            .sign_canonical(
                &organization_ref("ACME-001").unwrap(),
                &CanonicalBytes::new(&payload).unwrap(),
            )
            .unwrap()
            .to_base64();

        let submit = CertificateArgs {
            command: CertificateCommand::Submit {
                subject: "student-1".into(),
                org: "ACME-001".into(),
                course: "X".into(),
                payload: payload_path,
                signature,
                archive: true,
            },
        };
        assert_eq!(run_certificate(&submit, &ws).unwrap(), 0);

        let subject = SubjectId::new("student-1").unwrap();
        let records = service.certificates_for(&subject).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_verified());
        assert!(records[0].artifact().is_some());

        let verify = CertificateArgs {
            command: CertificateCommand::Verify {
                id: records[0].id().to_string(),
            },
        };
        assert_eq!(run_certificate(&verify, &ws).unwrap(), 0);

        let list = CertificateArgs {
            command: CertificateCommand::List {
                subject: "student-1".into(),
            },
        };
        assert_eq!(run_certificate(&list, &ws).unwrap(), 0);
    }

    #[test]
    fn suspended_submission_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = workspace(tmp.path());
        let payload_path = tmp.path().join("payload.json");
        std::fs::write(&payload_path, "{}").unwrap();
        let submit = CertificateArgs {
            command: CertificateCommand::Submit {
                subject: "student-1".into(),
                org: "GLOBEX-7".into(),
                course: "X".into(),
                payload: payload_path,
                signature: "AAAA".into(),
                archive: false,
            },
        };
        let err = run_certificate(&submit, &ws).unwrap_err();
        assert!(format!("{err:#}").contains("not eligible"));
        assert!(!ws.certificates_path().exists());
    }

    #[test]
    fn verify_rejects_bad_id() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = workspace(tmp.path());
        let verify = CertificateArgs {
            command: CertificateCommand::Verify {
                id: "not-a-uuid".into(),
            },
        };
        assert!(run_certificate(&verify, &ws).is_err());
    }
}
