//! Loading the licensing authority's verification key from disk.

use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::ValueEnum;
use ed25519_dalek::{VerifyingKey, PUBLIC_KEY_LENGTH};
use edgelic_core::IssuerKey;

/// On-disk encoding of the issuer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyFormat {
    /// RSA public key, PEM (RS*/PS* tokens).
    RsaPem,
    /// EC public key, PEM (ES* tokens).
    EcPem,
    /// Ed25519 public key, PEM (EdDSA tokens).
    EdPem,
    /// Raw 32-byte Ed25519 public key, base64 encoded.
    Ed25519,
    /// Shared HMAC secret, used as-is (HS* tokens).
    Hmac,
}

/// Read and parse the key at `path`.
pub fn load_issuer_key(path: &Path, format: KeyFormat) -> Result<IssuerKey> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read issuer key {}", path.display()))?;
    parse_issuer_key(&bytes, format)
        .with_context(|| format!("invalid issuer key {}", path.display()))
}

/// Parse key material already in memory.
pub fn parse_issuer_key(bytes: &[u8], format: KeyFormat) -> Result<IssuerKey> {
    let key = match format {
        KeyFormat::RsaPem => IssuerKey::from_rsa_pem(bytes)?,
        KeyFormat::EcPem => IssuerKey::from_ec_pem(bytes)?,
        KeyFormat::EdPem => IssuerKey::from_ed_pem(bytes)?,
        KeyFormat::Ed25519 => {
            let text = std::str::from_utf8(bytes).context("Ed25519 key is not text")?;
            let raw = STANDARD
                .decode(text.trim())
                .context("Ed25519 key is not valid base64")?;
            let Ok(raw) = <[u8; PUBLIC_KEY_LENGTH]>::try_from(raw.as_slice()) else {
                bail!(
                    "Ed25519 key must be {PUBLIC_KEY_LENGTH} bytes, got {}",
                    raw.len()
                );
            };
            let verifying = VerifyingKey::from_bytes(&raw).context("not an Ed25519 point")?;
            IssuerKey::from_ed25519(&verifying)?
        }
        KeyFormat::Hmac => IssuerKey::from_hmac_secret(bytes)?,
    };
    tracing::debug!(family = key.family(), "loaded issuer key");
    Ok(key)
}
