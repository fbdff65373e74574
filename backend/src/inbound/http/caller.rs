//! Bearer-token caller extraction.
//!
//! Resolves the `Authorization: Bearer` header through the identity provider
//! and then loads the caller's roles. A missing or rejected token fails with
//! 401 before the role directory (or anything else touching the datastore)
//! is consulted.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::ports::{BearerToken, RoleDirectoryError};
use crate::domain::{Caller, Error};

use super::state::HttpState;

/// The authenticated caller of the current request.
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller(pub Caller);

impl AuthenticatedCaller {
    pub fn caller(&self) -> &Caller {
        &self.0
    }
}

fn bearer_token(req: &HttpRequest) -> Option<BearerToken> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()
        .and_then(BearerToken::from_header)
}

fn map_role_error(error: RoleDirectoryError) -> Error {
    match error {
        RoleDirectoryError::Connection { message } => {
            Error::service_unavailable("Datastore unavailable", message)
        }
        RoleDirectoryError::Query { message } => Error::internal(message),
    }
}

/// Resolve `token` into a caller with roles.
///
/// # Errors
///
/// 401 when the token is rejected, 503 when the auth provider or datastore is
/// unreachable.
pub async fn resolve_caller(state: &HttpState, token: &BearerToken) -> Result<Caller, Error> {
    let user_id = state
        .identity
        .resolve(token)
        .await
        .map_err(|error| {
            warn!(%error, "bearer token verification failed");
            Error::service_unavailable("Authentication unavailable", error.to_string())
        })?
        .ok_or_else(Error::unauthorized)?;
    let roles = state
        .roles
        .roles_for(&user_id)
        .await
        .map_err(map_role_error)?;
    Ok(Caller { user_id, roles })
}

impl FromRequest for AuthenticatedCaller {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let state = req.app_data::<web::Data<HttpState>>().cloned();
        Box::pin(async move {
            let state = state.ok_or_else(|| Error::internal("HTTP state is not configured"))?;
            let token = token.ok_or_else(Error::unauthorized)?;
            resolve_caller(&state, &token).await.map(Self)
        })
    }
}
