//! # License Token Validation
//!
//! Verifies a compact JWS license and classifies the result. Checks run in a
//! fixed order and the first failure wins:
//!
//! 1. Signature, structure, issuer and audience.
//! 2. Lifetime against the caller-supplied `now`.
//! 3. Replay: the token id must echo the expected nonce, when one is given.
//! 4. Identity binding: `device` = host, `iothub` = hub, and `module` = module
//!    instance when the token names a module (absent or empty is a wildcard).
//!
//! Every domain mismatch is returned as a [`ValidationOutcome`]; validation
//! never panics or errors, which lets the enforcement loop apply one policy
//! to all failure kinds.

use chrono::{DateTime, Utc};
use jsonwebtoken::Validation;
use serde::Serialize;
use std::collections::HashSet;

use crate::identity::ModuleIdentity;
use crate::key::IssuerKey;
use crate::token::LicenseToken;

/// Classified result of validating one license token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Valid,
    Expired,
    NotYetValid,
    InvalidSignatureOrStructure,
    AudienceMismatch,
    IssuerMismatch,
    IdentityMismatch,
    SuspectedReplay,
}

impl ValidationOutcome {
    /// `true` only for [`ValidationOutcome::Valid`].
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Stable snake_case name, used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::InvalidSignatureOrStructure => "invalid_signature_or_structure",
            Self::AudienceMismatch => "audience_mismatch",
            Self::IssuerMismatch => "issuer_mismatch",
            Self::IdentityMismatch => "identity_mismatch",
            Self::SuspectedReplay => "suspected_replay",
        }
    }
}

impl std::fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied context for one validation.
#[derive(Debug, Clone, Copy)]
pub struct ValidationRequest<'a> {
    /// Nonce the token id must echo. `None` disables the replay check.
    pub expected_token_id: Option<&'a str>,
    pub valid_audience: &'a str,
    pub valid_issuer: &'a str,
    /// Point in time the lifetime is checked against.
    pub now: DateTime<Utc>,
    pub module_instance_name: &'a str,
    pub host_name: &'a str,
    pub hub_name: &'a str,
}

impl<'a> ValidationRequest<'a> {
    /// Build a request for `identity`, with no replay check.
    pub fn for_identity(
        identity: &'a ModuleIdentity,
        valid_audience: &'a str,
        valid_issuer: &'a str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            expected_token_id: None,
            valid_audience,
            valid_issuer,
            now,
            module_instance_name: identity.module_instance_name(),
            host_name: identity.host_name(),
            hub_name: identity.hub_name(),
        }
    }

    /// Require the token id to equal `nonce`.
    pub fn expecting_token_id(mut self, nonce: Option<&'a str>) -> Self {
        self.expected_token_id = nonce;
        self
    }
}

/// Check `now` against a token's validity window.
///
/// Both bounds are inclusive: a token is valid at exactly `not_before` and
/// at exactly `expires_at`.
pub fn check_lifetime(
    not_before: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ValidationOutcome {
    if now < not_before {
        ValidationOutcome::NotYetValid
    } else if now > expires_at {
        ValidationOutcome::Expired
    } else {
        ValidationOutcome::Valid
    }
}

/// Stateless license validator bound to one issuer key.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    key: IssuerKey,
}

impl TokenValidator {
    pub fn new(key: IssuerKey) -> Self {
        Self { key }
    }

    /// Validate `token` and classify the result.
    pub fn validate(&self, token: &str, request: &ValidationRequest<'_>) -> ValidationOutcome {
        match self.decode(token, request) {
            Ok(claims) => evaluate_claims(&claims, request),
            Err(outcome) => outcome,
        }
    }

    /// Verify the signature, issuer and audience, and decode the claims.
    ///
    /// A token without `iss` or `aud` is a mismatch, not a wildcard.
    /// Lifetime is not checked here (`jsonwebtoken` reads the system clock);
    /// see [`check_lifetime`].
    pub fn decode(
        &self,
        token: &str,
        request: &ValidationRequest<'_>,
    ) -> Result<LicenseToken, ValidationOutcome> {
        let mut validation = Validation::default();
        validation.algorithms = self.key.algorithms().to_vec();
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        let claims =
            jsonwebtoken::decode::<LicenseToken>(token.trim(), self.key.decoding_key(), &validation)
                .map(|data| data.claims)
                .map_err(|_| ValidationOutcome::InvalidSignatureOrStructure)?;

        if claims.issuer.as_deref() != Some(request.valid_issuer) {
            return Err(ValidationOutcome::IssuerMismatch);
        }
        let audience_ok = claims
            .audience
            .as_ref()
            .is_some_and(|aud| aud.contains(request.valid_audience));
        if !audience_ok {
            return Err(ValidationOutcome::AudienceMismatch);
        }
        Ok(claims)
    }
}

/// Steps 2–4 on already verified claims.
fn evaluate_claims(claims: &LicenseToken, request: &ValidationRequest<'_>) -> ValidationOutcome {
    let lifetime = check_lifetime(claims.not_before, claims.expires_at, request.now);
    if !lifetime.is_valid() {
        return lifetime;
    }

    if let Some(expected) = request.expected_token_id {
        if claims.id.as_deref() != Some(expected) {
            return ValidationOutcome::SuspectedReplay;
        }
    }

    let device_ok = claims.device.as_deref() == Some(request.host_name);
    let hub_ok = claims.iothub.as_deref() == Some(request.hub_name);
    let module_ok = claims
        .module_scope()
        .map_or(true, |module| module == request.module_instance_name);

    if device_ok && hub_ok && module_ok {
        ValidationOutcome::Valid
    } else {
        ValidationOutcome::IdentityMismatch
    }
}
