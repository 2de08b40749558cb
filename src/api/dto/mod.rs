//! Data Transfer Objects for REST request/response serialization.

pub mod health_dto;
pub mod oauth_dto;
pub mod webhook_dto;

pub use health_dto::*;
pub use oauth_dto::*;
pub use webhook_dto::*;
