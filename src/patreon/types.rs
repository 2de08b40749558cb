//! Patreon OAuth and API v2 response types.
//!
//! Only the fields the gateway reads are modelled; unknown fields and
//! included resource types are ignored.

use serde::{Deserialize, Serialize};

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// Always `"Bearer"`.
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Membership state of a patron towards the campaign.
///
/// Serialized as Patreon's snake_case string. Statuses Patreon adds later
/// are kept verbatim in [`PatronStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PatronStatus {
    /// Pledge is current.
    ActivePatron,
    /// Last charge was declined.
    DeclinedPatron,
    /// Pledge was cancelled.
    FormerPatron,
    /// Any other status string.
    Other(String),
}

impl PatronStatus {
    /// Status as Patreon spells it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ActivePatron => "active_patron",
            Self::DeclinedPatron => "declined_patron",
            Self::FormerPatron => "former_patron",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for PatronStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "active_patron" => Self::ActivePatron,
            "declined_patron" => Self::DeclinedPatron,
            "former_patron" => Self::FormerPatron,
            _ => Self::Other(raw),
        }
    }
}

impl From<PatronStatus> for String {
    fn from(status: PatronStatus) -> Self {
        match status {
            PatronStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// `GET /api/oauth2/v2/identity` response.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityResponse {
    /// The authenticated user.
    pub data: UserData,
    /// Memberships and any other requested includes.
    #[serde(default)]
    pub included: Vec<IncludedResource>,
}

/// User resource.
#[derive(Debug, Clone, Deserialize)]
pub struct UserData {
    /// Patreon user ID.
    pub id: String,
    /// Requested user fields.
    #[serde(default)]
    pub attributes: UserAttributes,
}

/// User fields requested through `fields[user]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserAttributes {
    /// Email, present when the `identity[email]` scope was granted.
    #[serde(default)]
    pub email: Option<String>,
    /// Given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Display name.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Whether Patreon verified the email.
    #[serde(default)]
    pub is_email_verified: Option<bool>,
}

/// Resource from the `included` array, discriminated by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncludedResource {
    /// A campaign membership.
    Member(MembershipData),
    /// Campaigns, tiers and anything else.
    #[serde(other)]
    Other,
}

/// Member resource.
#[derive(Debug, Clone, Deserialize)]
pub struct MembershipData {
    /// Member ID.
    pub id: String,
    /// Requested member fields.
    #[serde(default)]
    pub attributes: MembershipAttributes,
}

/// Member fields requested through `fields[member]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MembershipAttributes {
    /// Pledge state; `null` for followers who never pledged.
    #[serde(default)]
    pub patron_status: Option<PatronStatus>,
    /// Whether the user only follows the campaign.
    #[serde(default)]
    pub is_follower: Option<bool>,
    /// Amount the patron is entitled to, in cents.
    #[serde(default)]
    pub currently_entitled_amount_cents: Option<i64>,
    /// Total support over the membership lifetime, in cents.
    #[serde(default)]
    pub lifetime_support_cents: Option<i64>,
}

/// Flattened view of an identity response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatreonUserInfo {
    /// Patreon user ID.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Display name.
    pub full_name: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Avatar URL.
    pub image_url: Option<String>,
    /// Whether Patreon verified the email.
    pub is_email_verified: bool,
    /// Whether the selected membership is an active pledge.
    pub is_patron: bool,
    /// Status of the selected membership.
    pub patron_status: Option<PatronStatus>,
    /// Current tier amount in cents.
    pub current_tier_amount_cents: i64,
    /// Lifetime support in cents.
    pub lifetime_support_cents: i64,
}

impl IdentityResponse {
    /// Reduces the identity response to a [`PatreonUserInfo`].
    ///
    /// The active membership wins when there is one; otherwise the first
    /// membership is used. Returns `None` when the user has no email.
    #[must_use]
    pub fn into_user_info(self) -> Option<PatreonUserInfo> {
        let memberships: Vec<MembershipData> = self
            .included
            .into_iter()
            .filter_map(|resource| match resource {
                IncludedResource::Member(member) => Some(member),
                IncludedResource::Other => None,
            })
            .collect();

        let membership = memberships
            .iter()
            .find(|m| m.attributes.patron_status == Some(PatronStatus::ActivePatron))
            .or_else(|| memberships.first());

        let patron_status = membership.and_then(|m| m.attributes.patron_status.clone());
        let attributes = self.data.attributes;
        let email = attributes.email.filter(|e| !e.trim().is_empty())?;

        Some(PatreonUserInfo {
            id: self.data.id,
            email,
            full_name: attributes.full_name,
            first_name: attributes.first_name,
            last_name: attributes.last_name,
            image_url: attributes.image_url,
            is_email_verified: attributes.is_email_verified.unwrap_or(false),
            is_patron: patron_status == Some(PatronStatus::ActivePatron),
            patron_status,
            current_tier_amount_cents: membership
                .and_then(|m| m.attributes.currently_entitled_amount_cents)
                .unwrap_or(0),
            lifetime_support_cents: membership
                .and_then(|m| m.attributes.lifetime_support_cents)
                .unwrap_or(0),
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn parse(json: &str) -> IdentityResponse {
        let Ok(identity) = serde_json::from_str::<IdentityResponse>(json) else {
            panic!("identity should parse");
        };
        identity
    }

    #[test]
    fn active_membership_makes_patron() {
        let identity = parse(
            r#"{
                "data": {"type": "user", "id": "42", "attributes": {
                    "email": "fan@example.org", "full_name": "Fan", "is_email_verified": true}},
                "included": [
                    {"type": "campaign", "id": "c1", "attributes": {"summary": "x"}},
                    {"type": "member", "id": "m1", "attributes": {"patron_status": "former_patron"}},
                    {"type": "member", "id": "m2", "attributes": {
                        "patron_status": "active_patron",
                        "currently_entitled_amount_cents": 500,
                        "lifetime_support_cents": 2500}}
                ]
            }"#,
        );
        let Some(info) = identity.into_user_info() else {
            panic!("user info expected");
        };
        assert!(info.is_patron);
        assert_eq!(info.patron_status, Some(PatronStatus::ActivePatron));
        assert_eq!(info.current_tier_amount_cents, 500);
        assert_eq!(info.lifetime_support_cents, 2500);
        assert!(info.is_email_verified);
    }

    #[test]
    fn first_membership_used_without_active_one() {
        let identity = parse(
            r#"{
                "data": {"type": "user", "id": "7", "attributes": {"email": "old@example.org"}},
                "included": [
                    {"type": "member", "id": "m1", "attributes": {"patron_status": "declined_patron"}},
                    {"type": "member", "id": "m2", "attributes": {"patron_status": "former_patron"}}
                ]
            }"#,
        );
        let Some(info) = identity.into_user_info() else {
            panic!("user info expected");
        };
        assert!(!info.is_patron);
        assert_eq!(info.patron_status, Some(PatronStatus::DeclinedPatron));
    }

    #[test]
    fn no_memberships_and_unknown_status() {
        let identity = parse(
            r#"{"data": {"type": "user", "id": "1", "attributes": {"email": "a@b.c"}}}"#,
        );
        let Some(info) = identity.into_user_info() else {
            panic!("user info expected");
        };
        assert!(!info.is_patron);
        assert_eq!(info.patron_status, None);

        let identity = parse(
            r#"{"data": {"type": "user", "id": "1", "attributes": {"email": "a@b.c"}},
                "included": [{"type": "member", "id": "m", "attributes": {"patron_status": "paused_patron"}}]}"#,
        );
        let Some(info) = identity.into_user_info() else {
            panic!("user info expected");
        };
        assert_eq!(
            info.patron_status,
            Some(PatronStatus::Other("paused_patron".to_string()))
        );
        assert!(!info.is_patron);
    }

    #[test]
    fn status_serializes_as_patreon_string() {
        let rendered = serde_json::to_value([
            PatronStatus::ActivePatron,
            PatronStatus::Other("paused_patron".to_string()),
        ])
        .ok();
        assert_eq!(
            rendered,
            Some(serde_json::json!(["active_patron", "paused_patron"]))
        );
    }

    #[test]
    fn missing_email_yields_none() {
        let identity = parse(r#"{"data": {"type": "user", "id": "1", "attributes": {}}}"#);
        assert!(identity.into_user_info().is_none());
    }
}
