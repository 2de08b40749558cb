//! PostgreSQL implementation of the subscriber store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::SubscriberStore;
use crate::config::GatewayConfig;
use crate::domain::{Subscriber, SubscriberEmail};
use crate::error::StoreError;

/// Column list shared by every query returning a subscriber.
const SUBSCRIBER_COLUMNS: &str = "id, email, is_active, created_at, updated_at";

type SubscriberRow = (Uuid, String, bool, DateTime<Utc>, DateTime<Utc>);

fn into_subscriber((id, email, is_active, created_at, updated_at): SubscriberRow) -> Subscriber {
    Subscriber {
        id,
        email,
        is_active,
        created_at,
        updated_at,
    }
}

/// PostgreSQL-backed subscriber store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresSubscriberStore {
    pool: PgPool,
}

impl PostgresSubscriberStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from the gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database is unreachable.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| StoreError::from_sqlx("connect to database", &e))?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations in `migrations/`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::new(format!("Failed to run migrations: {e}")))
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SubscriberStore for PostgresSubscriberStore {
    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>, StoreError> {
        let email = SubscriberEmail::new(email);
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx("retrieve subscriber", &e))?;

        Ok(row.map(into_subscriber))
    }

    async fn upsert(&self, email: &str, is_active: bool) -> Result<Subscriber, StoreError> {
        let email = SubscriberEmail::new(email);
        // Single statement so concurrent deliveries resolve in the database.
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            "INSERT INTO subscribers (email, is_active) VALUES ($1, $2) \
             ON CONFLICT (email) DO UPDATE \
             SET is_active = EXCLUDED.is_active, updated_at = now() \
             RETURNING {SUBSCRIBER_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx("upsert subscriber", &e))?
        .ok_or_else(|| StoreError::new("Upsert operation returned no data"))?;

        Ok(into_subscriber(row))
    }

    async fn set_active_status(
        &self,
        email: &str,
        is_active: bool,
    ) -> Result<Option<Subscriber>, StoreError> {
        let email = SubscriberEmail::new(email);
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            "UPDATE subscribers SET is_active = $2, updated_at = now() \
             WHERE email = $1 RETURNING {SUBSCRIBER_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx("update subscriber status", &e))?;

        Ok(row.map(into_subscriber))
    }

    async fn delete(&self, email: &str) -> Result<bool, StoreError> {
        let email = SubscriberEmail::new(email);
        let result = sqlx::query("DELETE FROM subscribers WHERE email = $1")
            .bind(email.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx("delete subscriber", &e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscribers")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx("count subscribers", &e))?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}
