use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{ApiError, ApiResult},
    repository::RepositoryState,
};

/// Claims
///
/// Payload expected inside the HS256 session token issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id.
    pub sub: Uuid,
    /// Expiration Time (exp): tokens past this instant are rejected.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Every authorization
/// decision downstream (membership, authorship) is made against `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// IdentityProvider
///
/// The single capability handlers depend on for "who is calling?". Concrete
/// session mechanisms (JWT, dev header, test doubles) live behind it, so no
/// handler knows how a session is represented on the wire.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` for any request without a valid session; `Err` only when the
    /// identity store itself could not be consulted.
    async fn resolve_caller_identity(&self, headers: &HeaderMap) -> ApiResult<Option<AuthUser>>;
}

/// IdentityState
///
/// The shared handle stored in `AppState`.
pub type IdentityState = Arc<dyn IdentityProvider>;

/// JwtIdentityProvider
///
/// Verifies `Authorization: Bearer <jwt>` and then confirms the subject still
/// exists, so deleted users lose access even with an unexpired token.
///
/// In `Env::Local` an `x-user-id` header naming an existing user is accepted
/// as a development bypass. It is ignored in production.
pub struct JwtIdentityProvider {
    repo: RepositoryState,
    config: AppConfig,
}

impl JwtIdentityProvider {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }

    async fn load_user(&self, user_id: Uuid) -> ApiResult<Option<AuthUser>> {
        let user = self.repo.get_user(user_id).await?;
        Ok(user.map(|user| AuthUser {
            id: user.id,
            name: user.name,
            email: user.email,
        }))
    }

    fn local_bypass_id(&self, headers: &HeaderMap) -> Option<Uuid> {
        if self.config.env != Env::Local {
            return None;
        }
        headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }

    fn bearer_subject(&self, headers: &HeaderMap) -> Option<Uuid> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())?
            .strip_prefix("Bearer ")?;

        let decoding_key = DecodingKey::from_secret(self.config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(data) => Some(data.claims.sub),
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                    other => tracing::debug!(reason = ?other, "rejected invalid token"),
                }
                None
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve_caller_identity(&self, headers: &HeaderMap) -> ApiResult<Option<AuthUser>> {
        if let Some(user_id) = self.local_bypass_id(headers) {
            if let Some(user) = self.load_user(user_id).await? {
                return Ok(Some(user));
            }
        }
        // Production, or the bypass header was absent/unknown: standard token flow.
        let Some(user_id) = self.bearer_subject(headers) else {
            return Ok(None);
        };
        self.load_user(user_id).await
    }
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument. Resolution is delegated to
/// the `IdentityProvider` in the application state; a request without a valid
/// session is rejected with 401 `{"error": "Unauthorized"}` before the handler
/// body runs. A failing identity store is a 500, not a 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    IdentityState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by the auth middleware for this request.
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let identity = IdentityState::from_ref(state);
        identity
            .resolve_caller_identity(&parts.headers)
            .await?
            .ok_or(ApiError::Unauthorized)
    }
}
