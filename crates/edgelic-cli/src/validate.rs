//! # Validate Subcommand
//!
//! One-shot offline validation of a license token file. Prints a JSON
//! report and exits 0 only when the token is valid.
//!
//! ```bash
//! edgelic validate license.jwt --issuer-key issuer.pem \
//!     --audience my-module --issuer https://licensing.example.com/ \
//!     --module modulename --host myedgehost --hub myiothub
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use edgelic_core::{ModuleIdentity, TokenValidator, ValidationOutcome, ValidationRequest};
use serde::Serialize;

use crate::key::{load_issuer_key, KeyFormat};
use crate::EXIT_LICENSE_INVALID;

/// Arguments for `edgelic validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// File containing the compact JWS.
    pub token_file: PathBuf,

    /// Issuer verification key.
    #[arg(long)]
    pub issuer_key: PathBuf,

    #[arg(long, value_enum, default_value = "rsa-pem")]
    pub key_format: KeyFormat,

    /// Audience the token must carry.
    #[arg(long)]
    pub audience: String,

    /// Issuer the token must carry.
    #[arg(long)]
    pub issuer: String,

    /// Module instance name.
    #[arg(long, env = "IOTEDGE_MODULEID")]
    pub module: String,

    /// Edge device name.
    #[arg(long, env = "IOTEDGE_DEVICEID")]
    pub host: String,

    /// IoT Hub name.
    #[arg(long, env = "IOTEDGE_IOTHUBHOSTNAME")]
    pub hub: String,

    /// Nonce the token id must echo. Omit to skip the replay check.
    #[arg(long)]
    pub expected_id: Option<String>,

    /// Evaluate the lifetime at this RFC 3339 instant instead of now.
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,
}

/// What `edgelic validate` prints.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub outcome: ValidationOutcome,
    pub valid: bool,
    pub evaluated_at: DateTime<Utc>,
}

/// Validate the token described by `args`.
pub fn evaluate(args: &ValidateArgs) -> Result<ValidationReport> {
    let identity = ModuleIdentity::new(&args.module, &args.host, &args.hub)?;
    let validator = TokenValidator::new(load_issuer_key(&args.issuer_key, args.key_format)?);
    let token = std::fs::read_to_string(&args.token_file)
        .with_context(|| format!("failed to read token {}", args.token_file.display()))?;

    let now = args.now.unwrap_or_else(Utc::now);
    let request = ValidationRequest::for_identity(&identity, &args.audience, &args.issuer, now)
        .expecting_token_id(args.expected_id.as_deref());
    let outcome = validator.validate(&token, &request);

    Ok(ValidationReport {
        outcome,
        valid: outcome.is_valid(),
        evaluated_at: now,
    })
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let report = evaluate(args)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.valid { 0 } else { EXIT_LICENSE_INVALID })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use std::path::Path;

    const SECRET: &[u8] = b"cli-test-secret";

    fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn args(dir: &Path, claims: serde_json::Value) -> ValidateArgs {
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap();
        ValidateArgs {
            token_file: write(dir, "license.jwt", format!("{token}\n").as_bytes()),
            issuer_key: write(dir, "issuer.key", SECRET),
            key_format: KeyFormat::Hmac,
            audience: "testaudience".into(),
            issuer: "testissuer".into(),
            module: "modulename".into(),
            host: "myedgehost".into(),
            hub: "myiothub".into(),
            expected_id: None,
            now: Some("2020-12-30T00:00:00Z".parse().unwrap()),
        }
    }

    fn claims() -> serde_json::Value {
        json!({
            "jti": "12345",
            "aud": "testaudience",
            "iss": "testissuer",
            "nbf": 1609285800,
            "exp": 1609372800,
            "module": "modulename",
            "device": "myedgehost",
            "iothub": "myiothub"
        })
    }

    #[test]
    fn valid_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let report = evaluate(&args(dir.path(), claims())).unwrap();
        assert_eq!(report.outcome, ValidationOutcome::Valid);
        assert!(report.valid);
        assert_eq!(run_validate(&args(dir.path(), claims())).unwrap(), 0);
    }

    #[test]
    fn replayed_token_exits_with_license_code() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(dir.path(), claims());
        a.expected_id = Some("67890".into());
        assert_eq!(evaluate(&a).unwrap().outcome, ValidationOutcome::SuspectedReplay);
        assert_eq!(run_validate(&a).unwrap(), EXIT_LICENSE_INVALID);
    }

    #[test]
    fn evaluation_instant_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(dir.path(), claims());
        a.now = Some("2021-01-05T00:00:00Z".parse().unwrap());
        assert_eq!(evaluate(&a).unwrap().outcome, ValidationOutcome::Expired);
    }

    #[test]
    fn report_serializes_snake_case_outcome() {
        let report = ValidationReport {
            outcome: ValidationOutcome::IdentityMismatch,
            valid: false,
            evaluated_at: "2020-12-30T00:00:00Z".parse().unwrap(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["outcome"], "identity_mismatch");
        assert_eq!(value["valid"], false);
    }

    #[test]
    fn blank_identity_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(dir.path(), claims());
        a.hub = " ".into();
        let err = evaluate(&a).unwrap_err();
        assert_eq!(err.to_string(), "hub name is null or blank");
    }
}
