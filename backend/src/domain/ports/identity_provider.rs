//! Driven port verifying caller bearer tokens with the auth provider.

use async_trait::async_trait;
use zeroize::Zeroizing;

use super::define_port_error;
use crate::domain::UserId;

/// Bearer token presented by the caller.
///
/// The token is wiped from memory on drop and never printed.
#[derive(Clone)]
pub struct BearerToken(Zeroizing<String>);

impl BearerToken {
    /// Parse an `Authorization` header value of the form `Bearer <token>`.
    ///
    /// # Examples
    /// ```
    /// use roster_sync::domain::ports::BearerToken;
    ///
    /// assert!(BearerToken::from_header("Bearer abc").is_some());
    /// assert!(BearerToken::from_header("Basic abc").is_none());
    /// assert!(BearerToken::from_header("Bearer   ").is_none());
    /// ```
    pub fn from_header(value: &str) -> Option<Self> {
        let (scheme, token) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        Some(Self(Zeroizing::new(token.to_owned())))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

define_port_error! {
    /// Errors raised while verifying a token.
    pub enum IdentityProviderError {
        /// The auth provider could not be reached or answered unexpectedly.
        Unavailable { message: String } =>
            "identity provider unavailable: {message}",
    }
}

/// Port resolving a bearer token to a platform user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the token is invalid or expired.
    async fn resolve(&self, token: &BearerToken) -> Result<Option<UserId>, IdentityProviderError>;
}

/// Fixture provider rejecting every token.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureIdentityProvider;

#[async_trait]
impl IdentityProvider for FixtureIdentityProvider {
    async fn resolve(&self, _token: &BearerToken) -> Result<Option<UserId>, IdentityProviderError> {
        Ok(None)
    }
}
