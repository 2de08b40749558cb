//! Patreon pledge webhook payloads and event classification.
//!
//! Patreon sends the member resource in the body and names the event in
//! the `X-Patreon-Event` header. The body alone does not say whether a
//! pledge was created or deleted, so classification always reads the
//! header.

use serde::{Deserialize, Serialize};

/// Header naming the event type of a delivery.
pub const EVENT_HEADER: &str = "x-patreon-event";

/// Header value for a new pledge.
pub const EVENT_PLEDGE_CREATE: &str = "members:pledge:create";

/// Header value for a cancelled pledge.
pub const EVENT_PLEDGE_DELETE: &str = "members:pledge:delete";

/// What a supported pledge event does to the subscriber record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PledgeAction {
    /// Pledge created: mark the subscriber active.
    Activate,
    /// Pledge deleted: mark the subscriber inactive.
    Deactivate,
}

impl PledgeAction {
    /// Maps the `X-Patreon-Event` header to an action. Returns `None` for
    /// missing or unsupported event types.
    #[must_use]
    pub fn from_event_type(event_type: Option<&str>) -> Option<Self> {
        match event_type.map(str::trim) {
            Some(EVENT_PLEDGE_CREATE) => Some(Self::Activate),
            Some(EVENT_PLEDGE_DELETE) => Some(Self::Deactivate),
            _ => None,
        }
    }

    /// Active flag written to the store for this action.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Activate)
    }

    /// Short event name used in logs and responses.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Activate => "pledge:create",
            Self::Deactivate => "pledge:delete",
        }
    }
}

/// Body of a Patreon member webhook delivery.
///
/// Every field is optional so that a well-formed but incomplete payload
/// still parses and is reported as a missing email rather than a JSON
/// error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// The member resource.
    #[serde(default)]
    pub data: Option<MemberData>,
    /// Related resources (user, campaign, tiers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included: Option<Vec<serde_json::Value>>,
    /// JSON:API links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<serde_json::Map<String, serde_json::Value>>,
}

/// JSON:API member resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberData {
    /// Resource type, `"member"` for pledge events.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Member ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Member attributes.
    #[serde(default)]
    pub attributes: Option<MemberAttributes>,
}

/// Attributes of a member resource relevant to subscriber sync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberAttributes {
    /// Patron email.
    #[serde(default)]
    pub email: Option<String>,
    /// Patron display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// `active_patron`, `declined_patron` or `former_patron`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patron_status: Option<String>,
    /// Status of the most recent charge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_charge_status: Option<String>,
    /// Date of the most recent charge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_charge_date: Option<String>,
    /// Amount the patron is entitled to, in cents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currently_entitled_amount_cents: Option<i64>,
}

impl WebhookPayload {
    /// Returns the member email when present and not blank.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.data
            .as_ref()?
            .attributes
            .as_ref()?
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
    }

    /// Member ID, for log context.
    #[must_use]
    pub fn member_id(&self) -> Option<&str> {
        self.data.as_ref()?.id.as_deref()
    }

    /// Resource type, for log context.
    #[must_use]
    pub fn member_kind(&self) -> Option<&str> {
        self.data.as_ref()?.kind.as_deref()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn classifies_supported_events() {
        assert_eq!(
            PledgeAction::from_event_type(Some("members:pledge:create")),
            Some(PledgeAction::Activate)
        );
        assert_eq!(
            PledgeAction::from_event_type(Some("members:pledge:delete")),
            Some(PledgeAction::Deactivate)
        );
        assert_eq!(PledgeAction::from_event_type(Some("members:update")), None);
        assert_eq!(PledgeAction::from_event_type(None), None);
    }

    #[test]
    fn action_flags() {
        assert!(PledgeAction::Activate.is_active());
        assert!(!PledgeAction::Deactivate.is_active());
        assert_eq!(PledgeAction::Deactivate.event_name(), "pledge:delete");
    }

    #[test]
    fn extracts_nested_email() {
        let body = r#"{"data":{"type":"member","id":"m-1","attributes":{"email":"Foo@Bar.com","patron_status":"active_patron"}}}"#;
        let Ok(payload) = serde_json::from_str::<WebhookPayload>(body) else {
            panic!("payload should parse");
        };
        assert_eq!(payload.email(), Some("Foo@Bar.com"));
        assert_eq!(payload.member_id(), Some("m-1"));
        assert_eq!(payload.member_kind(), Some("member"));
    }

    #[test]
    fn missing_or_blank_email_is_none() {
        for body in [
            r#"{}"#,
            r#"{"data":{}}"#,
            r#"{"data":{"attributes":{}}}"#,
            r#"{"data":{"attributes":{"email":"  "}}}"#,
        ] {
            let Ok(payload) = serde_json::from_str::<WebhookPayload>(body) else {
                panic!("payload should parse: {body}");
            };
            assert_eq!(payload.email(), None, "{body}");
        }
    }
}
