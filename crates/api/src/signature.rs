// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 CreditCore Contributors
//
// This file is part of CreditCore.
//
// CreditCore is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// CreditCore is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with CreditCore. If not, see <https://www.gnu.org/licenses/>.

//! Webhook HMAC verification.
//!
//! `X-Webhook-Signature` carries the lowercase hex of
//! `HMAC-SHA256(secret, raw_body)`. Comparison is constant-time over the
//! decoded bytes; hex-decoding failures and length mismatches reject
//! without touching the MAC.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Minimum webhook secret length, enforced at startup.
pub const MIN_SECRET_LEN: usize = 32;

/// Verifier (and test-side signer) for webhook payloads.
#[derive(Clone)]
pub struct WebhookSignature {
    secret: SecretString,
}

impl WebhookSignature {
    /// Build the verifier. Fails closed on short secrets.
    pub fn new(secret: SecretString) -> Result<Self, String> {
        if secret.expose_secret().len() < MIN_SECRET_LEN {
            return Err(format!(
                "webhook secret must be at least {MIN_SECRET_LEN} bytes, got {}",
                secret.expose_secret().len()
            ));
        }
        Ok(Self { secret })
    }

    /// Compute the lowercase-hex signature for a body.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("hmac accepts any key length");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a header value against a body in constant time.
    pub fn verify(&self, body: &[u8], header: &str) -> bool {
        let Ok(claimed) = hex::decode(header) else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("hmac accepts any key length");
        mac.update(body);
        let expected = mac.finalize().into_bytes();
        if claimed.len() != expected.len() {
            return false;
        }
        expected.ct_eq(claimed.as_slice()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> WebhookSignature {
        WebhookSignature::new(SecretString::from(
            "0123456789abcdef0123456789abcdef".to_string(),
        ))
        .unwrap()
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let v = verifier();
        let body = br#"{"provider_reference":"r1"}"#;
        let signature = v.sign(body);
        assert!(v.verify(body, &signature));
    }

    #[test]
    fn test_signature_is_lowercase_hex() {
        let signature = verifier().sign(b"x");
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let v = verifier();
        let signature = v.sign(b"original");
        assert!(!v.verify(b"tampered", &signature));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = WebhookSignature::new(SecretString::from(
            "ffffffffffffffffffffffffffffffff".to_string(),
        ))
        .unwrap();
        let signature = other.sign(b"body");
        assert!(!verifier().verify(b"body", &signature));
    }

    #[test]
    fn test_garbage_header_rejected() {
        let v = verifier();
        assert!(!v.verify(b"body", "not-hex"));
        assert!(!v.verify(b"body", ""));
        assert!(!v.verify(b"body", "abcd"));
    }

    #[test]
    fn test_short_secret_fails_closed() {
        assert!(WebhookSignature::new(SecretString::from("short".to_string())).is_err());
    }
}
