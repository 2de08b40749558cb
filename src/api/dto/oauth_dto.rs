//! OAuth query parameters.

use serde::Deserialize;
use utoipa::IntoParams;

/// Query for `GET /api/patreon/auth`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuthorizeParams {
    /// Same-site path to return to after sign-in. Defaults to `/`.
    #[serde(default)]
    pub redirect: Option<String>,
}

/// Query for `GET /api/patreon/callback`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CallbackParams {
    /// Authorization code issued by Patreon.
    #[serde(default)]
    pub code: Option<String>,
    /// State token echoed back by Patreon.
    #[serde(default)]
    pub state: Option<String>,
    /// Set by Patreon when the user declined.
    #[serde(default)]
    pub error: Option<String>,
}
