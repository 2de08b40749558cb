//! Patreon integration: webhook signatures, API types and HTTP client.

pub mod client;
pub mod signature;
pub mod types;

pub use client::{HttpPatreonClient, PatreonApi, PatreonApiError};
pub use signature::{SIGNATURE_HEADER, SignatureError, sign, verify_signature};
pub use types::{IdentityResponse, PatreonUserInfo, PatronStatus, TokenResponse};
