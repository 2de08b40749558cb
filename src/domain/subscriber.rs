//! Subscriber record as stored in the `subscribers` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A Patreon supporter known to the site.
///
/// At most one record exists per normalized email. Records are created on
/// the first pledge or sign-in and afterwards only have their active flag
/// flipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Subscriber {
    /// Store-assigned identifier.
    pub id: Uuid,
    /// Normalized email address.
    pub email: String,
    /// Whether the subscriber currently holds an active pledge.
    pub is_active: bool,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}
