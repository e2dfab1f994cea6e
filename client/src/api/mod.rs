//! Backend REST API client

mod client;
mod types;

pub use client::ApiClient;
pub use types::{ApiEnvelope, ClientError, LoginData, RolePayload, UserId, UserPayload};
