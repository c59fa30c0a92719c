// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `X-Hub-Signature-256` verification for webhook deliveries.
//!
//! Meta signs each POST body with HMAC-SHA256 keyed by the app secret and
//! sends `sha256=<lowercase hex>` in the header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const PREFIX: &str = "sha256=";

/// Result of checking a delivery's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureValidation {
    Valid,
    Invalid,
    /// A secret is configured but the header is absent.
    Missing,
    /// No app secret configured; deliveries are not checked.
    NotConfigured,
}

impl SignatureValidation {
    /// Whether the delivery may be processed.
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Valid | Self::NotConfigured)
    }
}

/// Checks `header` against the HMAC of `body` keyed by `app_secret`.
///
/// The comparison is constant time.
pub fn verify_signature(
    app_secret: Option<&str>,
    header: Option<&str>,
    body: &[u8],
) -> SignatureValidation {
    let Some(secret) = app_secret else {
        return SignatureValidation::NotConfigured;
    };
    let Some(header) = header else {
        return SignatureValidation::Missing;
    };
    let Some(expected) = header
        .strip_prefix(PREFIX)
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
    else {
        return SignatureValidation::Invalid;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return SignatureValidation::Invalid;
    };
    mac.update(body);
    match mac.verify_slice(&expected) {
        Ok(()) => SignatureValidation::Valid,
        Err(_) => SignatureValidation::Invalid,
    }
}

/// Computes the header value Meta would send for `body`.
pub fn sign(app_secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(app_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("{PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}
