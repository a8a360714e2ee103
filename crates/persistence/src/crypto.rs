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

//! PII encryption at rest.
//!
//! `full_name` and `identity_document` are stored as XChaCha20-Poly1305
//! ciphertext: a random 24-byte nonce followed by the AEAD output. The key
//! lives only in process memory, loaded from the environment at startup and
//! validated there (minimum 32 bytes, fail-closed). Decryption happens only
//! where a plaintext is actually needed: worker-side document validation and
//! the API response helper, which masks the document before logging.

use crate::{PersistenceError, PersistenceResult};
use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{AeadCore, XChaCha20Poly1305, XNonce};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Nonce length for XChaCha20-Poly1305.
const NONCE_LEN: usize = 24;

/// Minimum key material length accepted at startup.
pub const MIN_KEY_LEN: usize = 32;

/// Domain separator for the fingerprint subkey.
const FINGERPRINT_CONTEXT: &[u8] = b"creditcore/document-fingerprint/v1";

/// Process-wide PII cipher.
///
/// Besides AEAD encryption it derives keyed, deterministic fingerprints of
/// identity documents: the ciphertext is nonce-randomized, so the
/// one-active-application-per-document unique index keys on the
/// fingerprint column instead.
#[derive(Clone)]
pub struct PiiCipher {
    cipher: XChaCha20Poly1305,
    fingerprint_key: Zeroizing<[u8; 32]>,
}

impl PiiCipher {
    /// Build the cipher from raw key material.
    ///
    /// Requires at least 32 bytes; the first 32 become the AEAD key, and
    /// the fingerprint subkey is derived from them under a domain-separated
    /// context. Key buffers are zeroized on drop.
    pub fn new(key_material: &[u8]) -> PersistenceResult<Self> {
        if key_material.len() < MIN_KEY_LEN {
            return Err(PersistenceError::Crypto(format!(
                "encryption key must be at least {MIN_KEY_LEN} bytes, got {}",
                key_material.len()
            )));
        }
        let key = Zeroizing::new(<[u8; 32]>::try_from(&key_material[..32]).expect("length checked"));

        let mut mac =
            <HmacSha256 as Mac>::new_from_slice(key.as_ref()).expect("hmac accepts any key length");
        mac.update(FINGERPRINT_CONTEXT);
        let derived = mac.finalize().into_bytes();
        let fingerprint_key =
            Zeroizing::new(<[u8; 32]>::try_from(derived.as_slice()).expect("sha256 output"));

        Ok(Self {
            cipher: XChaCha20Poly1305::new(key.as_ref().into()),
            fingerprint_key,
        })
    }

    /// Deterministic keyed digest of an identity document.
    ///
    /// The document is normalized first (separators stripped, uppercased)
    /// so `123.456.789-09` and `12345678909` collide as intended.
    pub fn document_fingerprint(&self, document: &str) -> Vec<u8> {
        let normalized = normalize_document(document);
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.fingerprint_key.as_ref())
            .expect("hmac accepts any key length");
        mac.update(normalized.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Encrypt a plaintext field. Output layout: nonce || ciphertext.
    pub fn encrypt(&self, plaintext: &str) -> PersistenceResult<Vec<u8>> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| PersistenceError::Crypto(format!("encryption failed: {e}")))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a stored field back to its plaintext.
    pub fn decrypt(&self, stored: &[u8]) -> PersistenceResult<String> {
        if stored.len() < NONCE_LEN {
            return Err(PersistenceError::Crypto(
                "ciphertext shorter than nonce".to_string(),
            ));
        }
        let (nonce, ciphertext) = stored.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|e| PersistenceError::Crypto(format!("decryption failed: {e}")))?;
        String::from_utf8(plaintext)
            .map_err(|e| PersistenceError::Crypto(format!("decrypted value not utf-8: {e}")))
    }
}

/// Normalize a document for fingerprinting: strip separators, uppercase.
pub fn normalize_document(document: &str) -> String {
    document
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.'))
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Mask a document for logs: keep the last four characters.
pub fn mask_document(document: &str) -> String {
    if document.len() <= 4 {
        return "****".to_string();
    }
    let visible: String = document.chars().skip(document.chars().count() - 4).collect();
    format!("****{visible}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> PiiCipher {
        PiiCipher::new(&[7u8; 32]).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let c = cipher();
        let stored = c.encrypt("Juan García López").unwrap();
        assert_eq!(c.decrypt(&stored).unwrap(), "Juan García López");
    }

    #[test]
    fn test_nonce_makes_ciphertexts_differ() {
        let c = cipher();
        let a = c.encrypt("12345678Z").unwrap();
        let b = c.encrypt("12345678Z").unwrap();
        assert_ne!(a, b);
        assert_eq!(c.decrypt(&a).unwrap(), c.decrypt(&b).unwrap());
    }

    #[test]
    fn test_short_key_rejected() {
        assert!(PiiCipher::new(&[0u8; 16]).is_err());
        assert!(PiiCipher::new(b"").is_err());
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let stored = cipher().encrypt("secret").unwrap();
        let other = PiiCipher::new(&[8u8; 32]).unwrap();
        assert!(other.decrypt(&stored).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let c = cipher();
        let mut stored = c.encrypt("secret").unwrap();
        let last = stored.len() - 1;
        stored[last] ^= 0xff;
        assert!(c.decrypt(&stored).is_err());
    }

    #[test]
    fn test_truncated_input_fails() {
        let c = cipher();
        assert!(c.decrypt(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_mask_document() {
        assert_eq!(mask_document("12345678Z"), "****678Z");
        assert_eq!(mask_document("abc"), "****");
    }

    #[test]
    fn test_fingerprint_is_deterministic_and_normalized() {
        let c = cipher();
        let a = c.document_fingerprint("123.456.789-09");
        let b = c.document_fingerprint("12345678909");
        let lower = c.document_fingerprint("x1234567l");
        let upper = c.document_fingerprint("X1234567L");
        assert_eq!(a, b);
        assert_eq!(lower, upper);
        assert_ne!(a, c.document_fingerprint("12345678Z"));
    }

    #[test]
    fn test_fingerprint_depends_on_key() {
        let stored = cipher().document_fingerprint("12345678Z");
        let other = PiiCipher::new(&[8u8; 32]).unwrap();
        assert_ne!(stored, other.document_fingerprint("12345678Z"));
    }
}
