//! # edgelic-core: License Tokens and Validation
//!
//! Shared building blocks for IoT Edge module licensing:
//!
//! - **Identity**: the module/device/hub triple a license is bound to,
//!   validated once at construction.
//! - **Issuer keys**: the verification half of the licensing authority's
//!   signing key (RSA, EC, Ed25519 or HMAC).
//! - **Token validation**: a pure, re-entrant check of a compact JWS license
//!   that classifies every mismatch as a [`ValidationOutcome`] instead of
//!   raising an error.
//! - **Cancellation**: the single stop signal shared by every suspension
//!   point of the enforcement loop.
//!
//! Nothing in this crate reads the system clock or performs I/O. Callers
//! supply `now` explicitly so that validation is reproducible.

pub mod cancel;
pub mod identity;
pub mod key;
pub mod token;
pub mod validation;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use identity::{IdentityError, ModuleIdentity};
pub use key::{IssuerKey, KeyError};
pub use token::{Audience, LicenseToken};
pub use validation::{check_lifetime, TokenValidator, ValidationOutcome, ValidationRequest};
