//! In-memory subscriber store.
//!
//! [`MemorySubscriberStore`] keeps every subscriber in a `HashMap` behind
//! a [`tokio::sync::RwLock`]. An upsert holds the write lock for its whole
//! read-modify-write, which gives it the same single-step conflict
//! resolution as the SQL `ON CONFLICT` statement.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::SubscriberStore;
use crate::domain::{Subscriber, SubscriberEmail};
use crate::error::StoreError;

/// Subscriber store living in process memory.
#[derive(Debug, Default)]
pub struct MemorySubscriberStore {
    subscribers: RwLock<HashMap<SubscriberEmail, Subscriber>>,
}

impl MemorySubscriberStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriberStore for MemorySubscriberStore {
    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>, StoreError> {
        let email = SubscriberEmail::new(email);
        Ok(self.subscribers.read().await.get(&email).cloned())
    }

    async fn upsert(&self, email: &str, is_active: bool) -> Result<Subscriber, StoreError> {
        let email = SubscriberEmail::new(email);
        let now = Utc::now();
        let mut map = self.subscribers.write().await;
        let subscriber = map
            .entry(email.clone())
            .and_modify(|s| {
                s.is_active = is_active;
                s.updated_at = now;
            })
            .or_insert_with(|| Subscriber {
                id: Uuid::new_v4(),
                email: email.into_inner(),
                is_active,
                created_at: now,
                updated_at: now,
            });
        Ok(subscriber.clone())
    }

    async fn set_active_status(
        &self,
        email: &str,
        is_active: bool,
    ) -> Result<Option<Subscriber>, StoreError> {
        let email = SubscriberEmail::new(email);
        let mut map = self.subscribers.write().await;
        Ok(map.get_mut(&email).map(|s| {
            s.is_active = is_active;
            s.updated_at = Utc::now();
            s.clone()
        }))
    }

    async fn delete(&self, email: &str) -> Result<bool, StoreError> {
        let email = SubscriberEmail::new(email);
        Ok(self.subscribers.write().await.remove(&email).is_some())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let len = self.subscribers.read().await.len();
        Ok(u64::try_from(len).unwrap_or(u64::MAX))
    }
}
