//! # patreon-gateway
//!
//! Backend for a portfolio site that gates content behind Patreon
//! membership.
//!
//! The HTTP side receives signed pledge webhooks and keeps a subscriber
//! table in sync, and runs the Patreon OAuth sign-in flow. The [`cta`]
//! module holds the client-side call-to-action generation pipeline: a
//! versioned generation cache, a streaming partial-JSON extractor and an
//! inference engine service.
//!
//! ## Architecture
//!
//! ```text
//! Patreon (webhooks, OAuth)          Browser
//!     │                                 │
//!     ├── REST Handlers (api/) ─────────┘
//!     │
//!     ├── WebhookService / OAuthService (service/)
//!     ├── Signature verification, Patreon client (patreon/)
//!     │
//!     └── SubscriberStore (persistence/): PostgreSQL or in-memory
//!
//! CtaGenerator (cta/)
//!     ├── GenerationCache ── KeyValueStorage
//!     ├── EngineService ──── InferenceEngine (OpenAI-compatible backend)
//!     └── PartialFieldExtractor
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod cta;
pub mod domain;
pub mod error;
pub mod patreon;
pub mod persistence;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;
