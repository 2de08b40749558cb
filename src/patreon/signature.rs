//! Patreon webhook signature verification.
//!
//! Patreon signs each delivery with HMAC-MD5 over the raw request body,
//! keyed by the webhook secret, and sends the lowercase hex digest in the
//! `X-Patreon-Signature` header. MD5 is dictated by Patreon; the digest
//! must match what they produce byte for byte.

use hmac::{Hmac, Mac};
use md5::Md5;

type HmacMd5 = Hmac<Md5>;

/// Header carrying the hex digest.
pub const SIGNATURE_HEADER: &str = "x-patreon-signature";

/// Length of a hex-encoded MD5 digest.
pub const SIGNATURE_HEX_LEN: usize = 32;

/// Why a webhook signature was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// No signature header on the request.
    #[error("Missing X-Patreon-Signature header")]
    MissingSignature,

    /// No webhook secret configured on this server.
    #[error("Webhook secret not configured (PATREON_WEBHOOK_SECRET)")]
    MissingSecret,

    /// Nothing to verify.
    #[error("Request body is empty")]
    EmptyBody,

    /// Claimed signature is not the length of an MD5 hex digest.
    #[error("Signature length mismatch")]
    LengthMismatch,

    /// Digest does not match.
    #[error("Signature verification failed")]
    Mismatch,

    /// Claimed signature could not be decoded, or the MAC could not be
    /// keyed.
    #[error("Signature verification error: {0}")]
    Malformed(String),
}

/// Verifies `signature` against the HMAC-MD5 of `body` under `secret`.
///
/// Inputs are checked before any hashing: a missing signature, missing
/// secret, empty body or wrong-length signature each yield their own
/// [`SignatureError`]. The digest comparison runs in constant time.
///
/// # Errors
///
/// Returns the [`SignatureError`] describing why the signature is not
/// valid.
pub fn verify_signature(
    body: &[u8],
    signature: Option<&str>,
    secret: Option<&str>,
) -> Result<(), SignatureError> {
    let signature = signature
        .filter(|s| !s.is_empty())
        .ok_or(SignatureError::MissingSignature)?;
    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or(SignatureError::MissingSecret)?;
    if body.is_empty() {
        return Err(SignatureError::EmptyBody);
    }
    if signature.len() != SIGNATURE_HEX_LEN {
        return Err(SignatureError::LengthMismatch);
    }

    // Compared as decoded digest bytes, so upper-case hex is accepted as well.
    let claimed = hex::decode(signature).map_err(|e| SignatureError::Malformed(e.to_string()))?;
    let mut mac = HmacMd5::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;
    mac.update(body);
    mac.verify_slice(&claimed)
        .map_err(|_| SignatureError::Mismatch)
}

/// Computes the signature Patreon would send for `body`.
///
/// # Errors
///
/// Returns [`SignatureError::Malformed`] if the MAC cannot be keyed.
pub fn sign(body: impl AsRef<[u8]>, secret: &str) -> Result<String, SignatureError> {
    let mut mac = HmacMd5::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;
    mac.update(body.as_ref());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key";

    fn signed(body: &str) -> String {
        let Ok(sig) = sign(body, SECRET) else {
            panic!("signing failed");
        };
        sig
    }

    #[test]
    fn known_digest() {
        // RFC 2202 test case 2 for HMAC-MD5.
        let Ok(sig) = sign("what do ya want for nothing?", "Jefe") else {
            panic!("signing failed");
        };
        assert_eq!(sig, "750c783e6ab0b503eaa86e310a5db738");
    }

    #[test]
    fn accepts_valid_signature() {
        let body = r#"{"data":{"attributes":{"email":"Foo@Bar.com"}}}"#;
        assert_eq!(verify_signature(body.as_bytes(), Some(&signed(body)), Some(SECRET)), Ok(()));
    }

    #[test]
    fn rejects_appended_character() {
        let body = r#"{"data":{}}"#;
        let tampered = format!("{}x", signed(body));
        assert_eq!(
            verify_signature(body.as_bytes(), Some(&tampered), Some(SECRET)),
            Err(SignatureError::LengthMismatch)
        );
    }

    #[test]
    fn rejects_modified_body() {
        let sig = signed(r#"{"amount":1}"#);
        assert_eq!(
            verify_signature(br#"{"amount":9}"#, Some(&sig), Some(SECRET)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_wrong_secret() {
        let body = "payload";
        let Ok(sig) = sign(body, "another-secret") else {
            panic!("signing failed");
        };
        assert_eq!(
            verify_signature(body.as_bytes(), Some(&sig), Some(SECRET)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn input_checks_have_distinct_reasons() {
        let sig = signed("body");
        assert_eq!(
            verify_signature(b"body", None, Some(SECRET)),
            Err(SignatureError::MissingSignature)
        );
        assert_eq!(
            verify_signature(b"body", Some(""), Some(SECRET)),
            Err(SignatureError::MissingSignature)
        );
        assert_eq!(
            verify_signature(b"body", Some(&sig), None),
            Err(SignatureError::MissingSecret)
        );
        assert_eq!(
            verify_signature(b"", Some(&sig), Some(SECRET)),
            Err(SignatureError::EmptyBody)
        );
        assert_eq!(
            verify_signature(b"body", Some("invalid-signature-12345"), Some(SECRET)),
            Err(SignatureError::LengthMismatch)
        );
    }

    #[test]
    fn non_hex_signature_is_rejected_not_raised() {
        let bogus = "z".repeat(SIGNATURE_HEX_LEN);
        let result = verify_signature(b"body", Some(&bogus), Some(SECRET));
        let Err(SignatureError::Malformed(reason)) = result else {
            panic!("expected malformed signature, got {result:?}");
        };
        assert!(!reason.is_empty());
        assert_eq!(
            SignatureError::Malformed(reason.clone()).to_string(),
            format!("Signature verification error: {reason}")
        );
    }

    #[test]
    fn upper_case_hex_is_accepted() {
        let body = "payload";
        let upper = signed(body).to_uppercase();
        assert_eq!(verify_signature(body.as_bytes(), Some(&upper), Some(SECRET)), Ok(()));
    }

    #[test]
    fn verifies_non_utf8_bodies() {
        let body = [0x7b_u8, 0xff, 0xfe, 0x7d];
        let Ok(sig) = sign(body, SECRET) else {
            panic!("signing failed");
        };
        assert_eq!(verify_signature(&body, Some(&sig), Some(SECRET)), Ok(()));
    }
}
