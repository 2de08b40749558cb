//! CSRF state for the Patreon OAuth flow.
//!
//! The state token and the post-login redirect travel together in the
//! `patreon_oauth_state` cookie. The cookie value is the URL-encoded JSON
//! bundle followed by `.` and the hex HMAC-SHA256 of that JSON, so a
//! client cannot swap in its own redirect target.

use std::fmt;

use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Random bytes in a state token (256 bits).
pub const STATE_TOKEN_BYTES: usize = 32;

/// Token and redirect issued at authorization start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthState {
    /// Hex-encoded random CSRF token.
    pub token: String,
    /// Same-site path to return to after sign-in.
    pub redirect: String,
}

impl OAuthState {
    /// Issues a fresh token for the given redirect target.
    #[must_use]
    pub fn issue(redirect: Option<&str>) -> Self {
        Self {
            token: generate_state_token(),
            redirect: sanitize_redirect(redirect),
        }
    }
}

/// Generates a hex-encoded token from [`STATE_TOKEN_BYTES`] random bytes.
#[must_use]
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; STATE_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Keeps only same-site absolute paths; everything else becomes `/`.
#[must_use]
pub fn sanitize_redirect(target: Option<&str>) -> String {
    match target.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Why a state cookie could not be read back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateCookieError {
    /// Cookie value is not `payload.signature` or not decodable.
    #[error("malformed state cookie")]
    Malformed,
    /// Signature does not match the payload.
    #[error("state cookie signature mismatch")]
    BadSignature,
    /// MAC could not be keyed.
    #[error("state cookie key rejected")]
    InvalidKey,
}

/// Signs and verifies state cookie values.
#[derive(Clone)]
pub struct StateCookieCodec {
    key: Vec<u8>,
}

impl fmt::Debug for StateCookieCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCookieCodec")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl StateCookieCodec {
    /// Creates a codec keyed by `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, StateCookieError> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| StateCookieError::InvalidKey)
    }

    /// Serializes and signs `state`.
    ///
    /// # Errors
    ///
    /// Returns [`StateCookieError`] if the state cannot be serialized or
    /// the MAC cannot be keyed.
    pub fn encode(&self, state: &OAuthState) -> Result<String, StateCookieError> {
        let json = serde_json::to_string(state).map_err(|_| StateCookieError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(json.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{}.{signature}", urlencoding::encode(&json)))
    }

    /// Verifies and deserializes a cookie value produced by
    /// [`StateCookieCodec::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`StateCookieError::Malformed`] for undecodable input and
    /// [`StateCookieError::BadSignature`] for tampered values.
    pub fn decode(&self, raw: &str) -> Result<OAuthState, StateCookieError> {
        let (payload, signature) = raw.rsplit_once('.').ok_or(StateCookieError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| StateCookieError::Malformed)?;
        let json = urlencoding::decode(payload).map_err(|_| StateCookieError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(json.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| StateCookieError::BadSignature)?;

        serde_json::from_str(&json).map_err(|_| StateCookieError::Malformed)
    }
}
