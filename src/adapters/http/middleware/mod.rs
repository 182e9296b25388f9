//! HTTP middleware for axum.
//!
//! - `auth` - Bearer token validation and the `RequireAuth` extractor
//! - `premium` - Entitlement gates for premium routes

pub mod auth;
pub mod premium;

pub use auth::{auth_middleware, AuthRejection, AuthState, RequireAuth};
pub use premium::{enforce_gate, require_feature, require_premium, require_usage, PremiumGate};
