//! Patreon OAuth2 and API v2 HTTP client.
//!
//! [`PatreonApi`] is the seam the OAuth flow depends on; the production
//! implementation is [`HttpPatreonClient`] on top of `reqwest`.

use async_trait::async_trait;

use super::types::{IdentityResponse, TokenResponse};
use crate::config::PatreonConfig;

/// Public Patreon origin.
pub const PATREON_BASE_URL: &str = "https://www.patreon.com";

/// Scopes requested at authorization: identity, email, memberships.
pub const OAUTH_SCOPES: &str = "identity identity[email] identity.memberships";

const USER_FIELDS: &str =
    "email,first_name,last_name,full_name,image_url,thumb_url,url,is_email_verified,created";
const MEMBER_FIELDS: &str = "patron_status,is_follower,pledge_cadence,currently_entitled_amount_cents,\
lifetime_support_cents,campaign_lifetime_support_cents,last_charge_status,last_charge_date,\
next_charge_date,will_pay_amount_cents";

/// Errors talking to the Patreon API.
#[derive(Debug, thiserror::Error)]
pub enum PatreonApiError {
    /// Network or decoding failure.
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        /// Logical endpoint name.
        endpoint: &'static str,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// Patreon answered with a non-success status.
    #[error("{endpoint} returned status {status}")]
    Status {
        /// Logical endpoint name.
        endpoint: &'static str,
        /// HTTP status code.
        status: u16,
    },

    /// Authorization URL could not be built.
    #[error("invalid authorization url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Operations the OAuth flow needs from Patreon.
#[async_trait]
pub trait PatreonApi: Send + Sync + std::fmt::Debug {
    /// Builds the URL the user agent is sent to for consent.
    ///
    /// # Errors
    ///
    /// Returns [`PatreonApiError::InvalidUrl`] if the base URL is invalid.
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String, PatreonApiError>;

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`PatreonApiError`] on transport failure or non-2xx status.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, PatreonApiError>;

    /// Fetches the authenticated user with their memberships.
    ///
    /// # Errors
    ///
    /// Returns [`PatreonApiError`] on transport failure or non-2xx status.
    async fn fetch_identity(&self, access_token: &str)
    -> Result<IdentityResponse, PatreonApiError>;
}

/// `reqwest`-based [`PatreonApi`].
#[derive(Debug, Clone)]
pub struct HttpPatreonClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl HttpPatreonClient {
    /// Creates a client for the public Patreon API.
    #[must_use]
    pub fn new(config: &PatreonConfig) -> Self {
        Self::with_base_url(config, PATREON_BASE_URL)
    }

    /// Creates a client against a different origin (staging or a local
    /// stand-in).
    #[must_use]
    pub fn with_base_url(config: &PatreonConfig, base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    async fn ensure_success(
        endpoint: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, PatreonApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!(endpoint, status = status.as_u16(), %body, "patreon request failed");
        Err(PatreonApiError::Status {
            endpoint,
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl PatreonApi for HttpPatreonClient {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String, PatreonApiError> {
        let url = url::Url::parse_with_params(
            &format!("{}/oauth2/authorize", self.base_url),
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", OAUTH_SCOPES),
                ("state", state),
            ],
        )?;
        Ok(url.into())
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, PatreonApiError> {
        const ENDPOINT: &str = "token exchange";
        let response = self
            .http
            .post(format!("{}/api/oauth2/token", self.base_url))
            .form(&[
                ("code", code),
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|source| PatreonApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;

        Self::ensure_success(ENDPOINT, response)
            .await?
            .json::<TokenResponse>()
            .await
            .map_err(|source| PatreonApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })
    }

    async fn fetch_identity(
        &self,
        access_token: &str,
    ) -> Result<IdentityResponse, PatreonApiError> {
        const ENDPOINT: &str = "identity";
        let response = self
            .http
            .get(format!("{}/api/oauth2/v2/identity", self.base_url))
            .query(&[
                ("fields[user]", USER_FIELDS),
                ("fields[member]", MEMBER_FIELDS),
                ("include", "memberships"),
            ])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|source| PatreonApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })?;

        Self::ensure_success(ENDPOINT, response)
            .await?
            .json::<IdentityResponse>()
            .await
            .map_err(|source| PatreonApiError::Transport {
                endpoint: ENDPOINT,
                source,
            })
    }
}
