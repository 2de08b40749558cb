//! Persistence layer: the subscriber store.
//!
//! Provides the [`SubscriberStore`] trait for idempotent CRUD over the
//! `subscribers` table. The production implementation uses
//! `sqlx::PgPool`; the in-memory implementation backs deployments with
//! persistence disabled and the test suite.
//!
//! Every operation normalizes its email argument through
//! [`SubscriberEmail`](crate::domain::SubscriberEmail) before touching
//! storage.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::Subscriber;
use crate::error::StoreError;

pub use memory::MemorySubscriberStore;
pub use postgres::PostgresSubscriberStore;

/// Idempotent subscriber storage keyed by normalized email.
#[async_trait]
pub trait SubscriberStore: Send + Sync + std::fmt::Debug {
    /// Fetches the subscriber with the given email.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>, StoreError>;

    /// Inserts the subscriber or updates its active flag when the email is
    /// already known. Safe to repeat with identical arguments.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn upsert(&self, email: &str, is_active: bool) -> Result<Subscriber, StoreError>;

    /// Updates the active flag of an existing subscriber. Returns `None`
    /// when no subscriber has this email.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn set_active_status(
        &self,
        email: &str,
        is_active: bool,
    ) -> Result<Option<Subscriber>, StoreError>;

    /// Removes the subscriber. Returns whether a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn delete(&self, email: &str) -> Result<bool, StoreError>;

    /// Number of stored subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn count(&self) -> Result<u64, StoreError>;

    /// Whether the email belongs to an active subscriber. Unknown emails
    /// are inactive.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn is_active(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self
            .get_by_email(email)
            .await?
            .is_some_and(|s| s.is_active))
    }
}
