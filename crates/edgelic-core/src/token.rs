//! Decoded license claims.
//!
//! A license is a compact JWS whose payload carries the registered claims
//! (`jti`, `aud`, `iss`, `nbf`, `exp`, `iat`) plus the identity claims
//! `device`, `iothub` and the optional `module`. `nbf` and `exp` are
//! mandatory: a license without a validity window is malformed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The `aud` claim, which JWT allows to be a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Whether `value` is one of the audiences.
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::Single(aud) => aud == value,
            Self::Multiple(auds) => auds.iter().any(|aud| aud == value),
        }
    }
}

/// Claims of a license token after signature verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseToken {
    /// Replay-detection identifier; echoes the fetch nonce for online licenses.
    #[serde(rename = "jti", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "aud", default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<Audience>,

    #[serde(rename = "iss", default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    #[serde(rename = "nbf", with = "chrono::serde::ts_seconds")]
    pub not_before: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,

    #[serde(
        rename = "iat",
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub issued_at: Option<DateTime<Utc>>,

    /// Module instance the license is scoped to. Absent or empty means any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iothub: Option<String>,
}

impl LicenseToken {
    /// The module claim, treating an empty string as absent.
    pub fn module_scope(&self) -> Option<&str> {
        self.module.as_deref().filter(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn deserializes_full_claim_set() {
        let json = serde_json::json!({
            "jti": "12345",
            "aud": "testaudience",
            "iss": "testissuer",
            "nbf": 1_609_286_400,
            "exp": 1_609_372_800,
            "iat": 1_609_287_000,
            "module": "modulename",
            "device": "myedgehost",
            "iothub": "myiothub"
        });
        let token: LicenseToken = serde_json::from_value(json).unwrap();
        assert_eq!(token.id.as_deref(), Some("12345"));
        assert_eq!(token.audience, Some(Audience::Single("testaudience".into())));
        assert_eq!(
            token.not_before,
            Utc.with_ymd_and_hms(2020, 12, 30, 0, 0, 0).unwrap()
        );
        assert_eq!(token.module_scope(), Some("modulename"));
        assert!(token.issued_at.is_some());
    }

    #[test]
    fn missing_lifetime_is_rejected() {
        let json = serde_json::json!({
            "aud": "a",
            "iss": "i",
            "exp": 1_609_372_800,
            "device": "d",
            "iothub": "h"
        });
        assert!(serde_json::from_value::<LicenseToken>(json).is_err());
    }

    #[test]
    fn empty_module_is_no_scope() {
        let json = serde_json::json!({
            "nbf": 0,
            "exp": 10,
            "module": ""
        });
        let token: LicenseToken = serde_json::from_value(json).unwrap();
        assert_eq!(token.module_scope(), None);
    }

    #[test]
    fn audience_list_membership() {
        let aud = Audience::Multiple(vec!["a".into(), "b".into()]);
        assert!(aud.contains("b"));
        assert!(!aud.contains("B"));
        assert!(Audience::Single("x".into()).contains("x"));
    }
}
