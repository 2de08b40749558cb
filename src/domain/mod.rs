//! Domain layer: subscriber identity and pledge webhook payloads.
//!
//! This module contains the server-side domain model: the normalized
//! email that keys the subscriber table, the subscriber record itself,
//! and the Patreon pledge event payload with its classification.

pub mod pledge_event;
pub mod subscriber;
pub mod subscriber_email;

pub use pledge_event::{
    EVENT_HEADER, EVENT_PLEDGE_CREATE, EVENT_PLEDGE_DELETE, PledgeAction, WebhookPayload,
};
pub use subscriber::Subscriber;
pub use subscriber_email::SubscriberEmail;
