//! # Cryptographic Error Types

use thiserror::Error;

/// Errors from cryptographic operations in `certrust-crypto`.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The requested modulus is below the accepted minimum.
    #[error("RSA modulus of {bits} bits is below the minimum of {min}")]
    ModulusTooSmall {
        /// Requested modulus size.
        bits: usize,
        /// Minimum accepted modulus size.
        min: usize,
    },

    /// Key generation failed.
    #[error("RSA key generation failed: {0}")]
    KeyGeneration(String),

    /// A key could not be encoded to PEM.
    #[error("key encoding failed: {0}")]
    KeyEncoding(String),

    /// A PEM document could not be decoded into a key.
    #[error("key decoding failed: {0}")]
    KeyDecoding(String),

    /// Signing failed inside the RSA primitive.
    #[error("signing failed: {0}")]
    Signing(String),

    /// The signature is not well-formed (bad base64, wrong length).
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The signature is well-formed but does not verify.
    #[error("signature verification failed")]
    VerificationFailed,

    /// Artifact store violation (bad kind, digest mismatch).
    #[error("artifact store error: {0}")]
    Artifact(String),

    /// I/O error from the artifact store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
