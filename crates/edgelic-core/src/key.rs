//! # Issuer Keys
//!
//! The verification key of the licensing authority, paired with the JWS
//! algorithms it may be used with. Signature primitives come from
//! `jsonwebtoken`; this type only decides which key family is accepted so
//! that a token cannot downgrade, for example, an RSA key to HMAC.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey};
use thiserror::Error;

/// Errors from loading issuer key material.
#[derive(Error, Debug)]
pub enum KeyError {
    /// The PEM or raw key material could not be parsed.
    #[error("invalid {family} issuer key: {source}")]
    Invalid {
        family: &'static str,
        #[source]
        source: jsonwebtoken::errors::Error,
    },

    /// An HMAC secret must not be empty.
    #[error("HMAC issuer secret is empty")]
    EmptySecret,
}

const RSA_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];
const EC_ALGORITHMS: &[Algorithm] = &[Algorithm::ES256, Algorithm::ES384];
const ED_ALGORITHMS: &[Algorithm] = &[Algorithm::EdDSA];
const HMAC_ALGORITHMS: &[Algorithm] = &[Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Public verification key of the licensing authority.
#[derive(Clone)]
pub struct IssuerKey {
    key: DecodingKey,
    algorithms: &'static [Algorithm],
    family: &'static str,
}

impl std::fmt::Debug for IssuerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerKey")
            .field("family", &self.family)
            .field("algorithms", &self.algorithms)
            .finish_non_exhaustive()
    }
}

impl IssuerKey {
    /// RSA public key in PEM (PKCS#1 or SPKI). Accepts RS* and PS*.
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self, KeyError> {
        let key = DecodingKey::from_rsa_pem(pem).map_err(|source| KeyError::Invalid {
            family: "RSA",
            source,
        })?;
        Ok(Self {
            key,
            algorithms: RSA_ALGORITHMS,
            family: "RSA",
        })
    }

    /// EC public key in PEM. Accepts ES256 and ES384.
    pub fn from_ec_pem(pem: &[u8]) -> Result<Self, KeyError> {
        let key = DecodingKey::from_ec_pem(pem).map_err(|source| KeyError::Invalid {
            family: "EC",
            source,
        })?;
        Ok(Self {
            key,
            algorithms: EC_ALGORITHMS,
            family: "EC",
        })
    }

    /// Ed25519 public key in PEM. Accepts EdDSA.
    pub fn from_ed_pem(pem: &[u8]) -> Result<Self, KeyError> {
        let key = DecodingKey::from_ed_pem(pem).map_err(|source| KeyError::Invalid {
            family: "Ed25519",
            source,
        })?;
        Ok(Self {
            key,
            algorithms: ED_ALGORITHMS,
            family: "Ed25519",
        })
    }

    /// Ed25519 verifying key. Accepts EdDSA.
    pub fn from_ed25519(verifying_key: &ed25519_dalek::VerifyingKey) -> Result<Self, KeyError> {
        let x = URL_SAFE_NO_PAD.encode(verifying_key.as_bytes());
        let key = DecodingKey::from_ed_components(&x).map_err(|source| KeyError::Invalid {
            family: "Ed25519",
            source,
        })?;
        Ok(Self {
            key,
            algorithms: ED_ALGORITHMS,
            family: "Ed25519",
        })
    }

    /// Shared HMAC secret. Accepts HS256, HS384 and HS512.
    pub fn from_hmac_secret(secret: &[u8]) -> Result<Self, KeyError> {
        if secret.is_empty() {
            return Err(KeyError::EmptySecret);
        }
        Ok(Self {
            key: DecodingKey::from_secret(secret),
            algorithms: HMAC_ALGORITHMS,
            family: "HMAC",
        })
    }

    /// Key family name, e.g. `"RSA"`.
    pub fn family(&self) -> &'static str {
        self.family
    }

    /// JWS algorithms this key verifies.
    pub fn algorithms(&self) -> &'static [Algorithm] {
        self.algorithms
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}
