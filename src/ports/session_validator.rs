//! Session validation port.
//!
//! Validates bearer tokens and extracts user identity. HTTP middleware
//! depends on this trait only; the JWT adapter and the test mock both
//! implement it.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates access tokens and extracts user identity.
///
/// # Contract
///
/// - `AuthError::InvalidToken` for malformed or badly signed tokens
/// - `AuthError::TokenExpired` for expired tokens
/// - `AuthError::ServiceUnavailable` for transient failures
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// `token` is the raw token without the "Bearer " prefix.
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use std::collections::HashMap;

    struct FixedTokens(HashMap<String, AuthenticatedUser>);

    #[async_trait]
    impl SessionValidator for FixedTokens {
        async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
            self.0.get(token).cloned().ok_or(AuthError::InvalidToken)
        }
    }

    fn validator() -> FixedTokens {
        let user = AuthenticatedUser::new(UserId::new("user-123").unwrap(), "test@example.com", None);
        FixedTokens(HashMap::from([("valid-token".to_string(), user)]))
    }

    #[tokio::test]
    async fn returns_user_for_known_token() {
        let user = validator().validate("valid-token").await.unwrap();
        assert_eq!(user.id.as_str(), "user-123");
    }

    #[tokio::test]
    async fn rejects_unknown_token() {
        assert!(matches!(
            validator().validate("other").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn session_validator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn SessionValidator>();
    }
}
