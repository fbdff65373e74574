//! Reqwest-backed [`IdentityProvider`].
//!
//! Verifies a caller token with `GET {auth}/auth/v1/user`. The provider only
//! reports who the caller is; roles come from the datastore.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::UserId;
use crate::domain::ports::{BearerToken, IdentityProvider, IdentityProviderError};

const USER_PATH: &str = "auth/v1/user";

#[derive(Debug, Deserialize)]
struct AuthUserDto {
    id: Uuid,
}

/// Identity provider backed by the auth service's user endpoint.
pub struct AuthHttpIdentityProvider {
    client: Client,
    user_url: Url,
    api_key: Option<Zeroizing<String>>,
}

impl AuthHttpIdentityProvider {
    /// Build a provider for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL cannot be extended or the reqwest client
    /// cannot be constructed.
    pub fn new(
        base_url: &Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, IdentityProviderError> {
        let user_url = user_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| IdentityProviderError::unavailable(error.to_string()))?;
        Ok(Self {
            client,
            user_url,
            api_key: api_key.map(Zeroizing::new),
        })
    }
}

fn user_url(base_url: &Url) -> Result<Url, IdentityProviderError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(USER_PATH)
        .map_err(|error| IdentityProviderError::unavailable(format!("invalid auth URL: {error}")))
}

#[async_trait]
impl IdentityProvider for AuthHttpIdentityProvider {
    async fn resolve(&self, token: &BearerToken) -> Result<Option<UserId>, IdentityProviderError> {
        let mut request = self
            .client
            .get(self.user_url.clone())
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", token.expose()));
        if let Some(api_key) = &self.api_key {
            request = request.header("apikey", api_key.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|error| IdentityProviderError::unavailable(error.to_string()))?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let user: AuthUserDto = response.json().await.map_err(|error| {
                    IdentityProviderError::unavailable(format!("invalid user payload: {error}"))
                })?;
                Ok(Some(UserId::from_uuid(user.id)))
            }
            status => Err(IdentityProviderError::unavailable(format!(
                "auth provider returned status {}",
                status.as_u16()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://auth.example", "https://auth.example/auth/v1/user")]
    #[case("https://example.test/project/", "https://example.test/project/auth/v1/user")]
    fn user_url_extends_the_base(#[case] base: &str, #[case] expected: &str) {
        let base = Url::parse(base).expect("valid url");
        assert_eq!(user_url(&base).expect("joins").as_str(), expected);
    }
}
