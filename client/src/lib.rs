//! Shared session, credential, and role-routing core for the Velora salon
//! platform front ends.
//!
//! The admin, staff, and customer applications all embed this crate: it owns
//! the authentication state machine, persisted credentials, idle-timeout
//! enforcement, and the cross-application role redirect. UI rendering and
//! the CRUD screens stay in the embedding shells, which observe
//! [`auth::AuthState`] and call into [`PortalApp`].

pub mod api;
pub mod app;
pub mod auth;
pub mod core;

pub use crate::app::PortalApp;
pub use crate::auth::{
    AuthContext, AuthState, AuthenticatedUser, CredentialScope, CredentialStore, GuardDecision,
    Interaction, LoginError, Navigator, Role, RouteGuard,
};
pub use crate::core::config::AppConfig;
