//! Authentication adapters implementing `SessionValidator`.
//!
//! - `jwt` - HS256 tokens issued by the LifeBuddy API
//! - `mock` - In-memory token table for tests and local development

mod jwt;
mod mock;

pub use jwt::{JwtSessionValidator, SessionClaims};
pub use mock::MockSessionValidator;
