//! # RSA Organization Keys
//!
//! Key generation, PEM transport, signing and verification for the
//! per-organization keypairs.
//!
//! ## Security Invariant
//!
//! - The signature scheme is fixed to RSASSA-PKCS1-v1_5 with SHA-256. It is
//!   deterministic: the same key and bytes always yield the same signature.
//! - Moduli below [`MIN_MODULUS_BITS`] are refused, both when generating
//!   and when decoding a stored key.
//! - `RsaKeyPair` does not implement `Serialize` and its `Debug` output is
//!   redacted. The PKCS#8 PEM is only handed out inside `Zeroizing`.
//!
//! ## Serde
//!
//! [`OrgSignature`] serializes as a standard (padded) base64 string.

use ::rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use ::rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use ::rsa::signature::{SignatureEncoding, Signer, Verifier};
use ::rsa::traits::PublicKeyParts;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use certrust_core::CanonicalBytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Smallest RSA modulus accepted anywhere in the workspace.
pub const MIN_MODULUS_BITS: usize = 2048;

/// Modulus size used when no explicit size is configured.
pub const DEFAULT_MODULUS_BITS: usize = 2048;

fn check_modulus(bits: usize) -> Result<(), CryptoError> {
    if bits < MIN_MODULUS_BITS {
        return Err(CryptoError::ModulusTooSmall {
            bits,
            min: MIN_MODULUS_BITS,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// OrgSignature
// ---------------------------------------------------------------------------

/// An RSASSA-PKCS1-v1_5 / SHA-256 signature produced by an organization key.
///
/// The byte length equals the signer's modulus size. No length check is
/// applied at construction; a wrong-length signature simply fails
/// verification as malformed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OrgSignature(Vec<u8>);

impl OrgSignature {
    /// Wrap raw signature bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Standard base64 with padding.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    /// Decode a standard base64 signature. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedSignature`] if the input is not
    /// valid base64.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        BASE64
            .decode(encoded.trim())
            .map(Self)
            .map_err(|e| CryptoError::MalformedSignature(format!("invalid base64: {e}")))
    }
}

impl Serialize for OrgSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for OrgSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for OrgSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b64 = self.to_base64();
        let prefix: String = b64.chars().take(12).collect();
        write!(f, "OrgSignature({prefix}..., {} bytes)", self.0.len())
    }
}

impl std::fmt::Display for OrgSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64())
    }
}

// ---------------------------------------------------------------------------
// RsaPublicKey
// ---------------------------------------------------------------------------

/// The public half of an organization keypair.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    inner: ::rsa::RsaPublicKey,
}

impl RsaPublicKey {
    /// Decode an SPKI (`BEGIN PUBLIC KEY`) PEM document.
    pub fn from_spki_pem(pem: &str) -> Result<Self, CryptoError> {
        let inner = ::rsa::RsaPublicKey::from_public_key_pem(pem.trim())
            .map_err(|e| CryptoError::KeyDecoding(format!("public key: {e}")))?;
        check_modulus(inner.size() * 8)?;
        Ok(Self { inner })
    }

    /// Encode as an SPKI PEM document with LF line endings.
    pub fn to_spki_pem(&self) -> Result<String, CryptoError> {
        self.inner
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyEncoding(format!("public key: {e}")))
    }

    /// Modulus size in bits.
    pub fn modulus_bits(&self) -> usize {
        self.inner.size() * 8
    }

    /// Verify a signature over arbitrary bytes.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::MalformedSignature`] when the signature length does
    ///   not match the modulus size.
    /// - [`CryptoError::VerificationFailed`] when the signature does not
    ///   verify over `message`.
    pub fn verify(&self, message: &[u8], signature: &OrgSignature) -> Result<(), CryptoError> {
        if signature.as_bytes().len() != self.inner.size() {
            return Err(CryptoError::MalformedSignature(format!(
                "expected {} bytes, got {}",
                self.inner.size(),
                signature.as_bytes().len()
            )));
        }
        let sig = Signature::try_from(signature.as_bytes())
            .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
        VerifyingKey::<Sha256>::new(self.inner.clone())
            .verify(message, &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }

    /// Verify a signature over canonical bytes.
    pub fn verify_canonical(
        &self,
        data: &CanonicalBytes,
        signature: &OrgSignature,
    ) -> Result<(), CryptoError> {
        self.verify(data.as_bytes(), signature)
    }
}

impl std::fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RsaPublicKey({} bits)", self.modulus_bits())
    }
}

// ---------------------------------------------------------------------------
// RsaKeyPair
// ---------------------------------------------------------------------------

/// A full organization keypair.
pub struct RsaKeyPair {
    private: ::rsa::RsaPrivateKey,
}

impl RsaKeyPair {
    /// Generate a fresh keypair from the OS random number generator.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::ModulusTooSmall`] before doing any work if
    /// `bits` is below [`MIN_MODULUS_BITS`].
    pub fn generate(bits: usize) -> Result<Self, CryptoError> {
        check_modulus(bits)?;
        let mut rng = rand_core::OsRng;
        let private = ::rsa::RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Ok(Self { private })
    }

    /// Decode a PKCS#8 (`BEGIN PRIVATE KEY`) PEM document.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, CryptoError> {
        let private = ::rsa::RsaPrivateKey::from_pkcs8_pem(pem.trim())
            .map_err(|e| CryptoError::KeyDecoding(format!("private key: {e}")))?;
        check_modulus(private.size() * 8)?;
        Ok(Self { private })
    }

    /// Encode the private key as PKCS#8 PEM with LF line endings.
    pub fn to_pkcs8_pem(&self) -> Result<Zeroizing<String>, CryptoError> {
        self.private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyEncoding(format!("private key: {e}")))
    }

    /// The public half.
    pub fn public_key(&self) -> RsaPublicKey {
        RsaPublicKey {
            inner: self.private.to_public_key(),
        }
    }

    /// Modulus size in bits.
    pub fn modulus_bits(&self) -> usize {
        self.private.size() * 8
    }

    /// Sign arbitrary bytes.
    pub fn sign(&self, message: &[u8]) -> Result<OrgSignature, CryptoError> {
        let signing_key = SigningKey::<Sha256>::new(self.private.clone());
        let sig = signing_key
            .try_sign(message)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        Ok(OrgSignature(sig.to_vec()))
    }

    /// Sign canonical bytes.
    pub fn sign_canonical(&self, data: &CanonicalBytes) -> Result<OrgSignature, CryptoError> {
        self.sign(data.as_bytes())
    }
}

impl std::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RsaKeyPair({} bits, <private>)", self.modulus_bits())
    }
}
