use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use chrono::{DateTime, Utc};
use headers::{Authorization, authorization::Bearer};

use crate::auth::{decode_claims, hash_access_token};
use crate::error::ApiError;
use crate::models::AppState;
use crate::session::PortalSession;

/// Caller identity taken from `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub token: String,
    pub token_hash: String,
    pub user_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

async fn bearer(parts: &mut Parts, state: &AppState) -> Result<String, ApiError> {
    let TypedHeader(authz): TypedHeader<Authorization<Bearer>> =
        TypedHeader::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::session_expired())?;
    Ok(authz.token().to_string())
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move { AuthContext::from_token(&bearer(parts, state).await?) }
    }
}

impl AuthContext {
    pub fn from_token(token: &str) -> Result<Self, ApiError> {
        let auth = AuthContext::identify(token)?;
        if auth.is_expired(Utc::now()) {
            return Err(ApiError::session_expired());
        }
        Ok(auth)
    }

    /// Reads identity from a well-formed token whether or not it has expired.
    pub fn identify(token: &str) -> Result<Self, ApiError> {
        let claims = decode_claims(token)
            .map_err(|e| ApiError::Unauthorized("INVALID_TOKEN", e.to_string()))?;

        Ok(AuthContext {
            token: token.to_string(),
            token_hash: hash_access_token(token),
            user_id: claims.subject,
            expires_at: claims.expires_at,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Caller identity for sign-out. An expired token is still accepted so the
/// session it started can be ended.
#[derive(Debug, Clone)]
pub struct SignOutContext(pub AuthContext);

impl FromRequestParts<AppState> for SignOutContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move { Ok(SignOutContext(AuthContext::identify(&bearer(parts, state).await?)?)) }
    }
}

/// An authenticated caller that also has a started portal session.
pub struct SessionContext {
    pub auth: AuthContext,
    pub session: Arc<PortalSession>,
}

impl FromRequestParts<AppState> for SessionContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let auth = AuthContext::identify(&bearer(parts, state).await?)?;
            if auth.is_expired(Utc::now()) {
                // The token is gone for good; so is the feed it opened.
                state.sessions.end(&auth.token_hash);
                return Err(ApiError::session_expired());
            }
            let session = state
                .sessions
                .get(&auth.token_hash)
                .ok_or_else(ApiError::no_session)?;

            Ok(SessionContext { auth, session })
        }
    }
}
