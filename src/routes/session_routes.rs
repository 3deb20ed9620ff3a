// src/routes/session_routes.rs

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};

use crate::{
    error::ApiError,
    middleware::auth_context::{AuthContext, SessionContext, SignOutContext},
    models::{ApiOk, AppState, OkResponse, SessionInfo},
    notifications::{
        LoadOptions,
        push::WsPushTransport,
        store::NotificationStore,
    },
    session::PortalSession,
};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        post(start_session).get(current_session).delete(end_session),
    )
}

fn session_info(session: &PortalSession) -> SessionInfo {
    let snapshot = session.store.snapshot();
    SessionInfo {
        session_id: session.session_id,
        user_id: session.user_id.clone(),
        started_at: session.started_at,
        connection_state: snapshot.connection_state,
        unread_count: snapshot.unread_count,
        last_error: snapshot.last_error,
    }
}

// --------------------------
// POST /session
// - subscribe to pushes, fetch the first page
// - neither failure blocks sign-in; the UI can retry a load later
// --------------------------

pub async fn start_session(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<SessionInfo>>, ApiError> {
    let api = state.backend.with_token(&auth.token);
    let store = Arc::new(NotificationStore::new(Arc::new(api), state.store_policy));

    let transport = WsPushTransport::new(
        &state.push_url,
        &auth.token,
        &auth.user_id,
        state.push_timeout,
    );
    if let Err(e) = store.start(&transport).await {
        tracing::warn!(user_id = %auth.user_id, error = %e, "session started without live notifications");
    }

    let first_page = LoadOptions {
        limit: Some(state.page_limit),
        ..Default::default()
    };
    if let Err(e) = store.load(&first_page).await {
        tracing::warn!(user_id = %auth.user_id, error = %e, "initial notification load failed");
    }

    let session = Arc::new(PortalSession::new(&auth.user_id, auth.expires_at, store));
    state.sessions.insert(auth.token_hash.clone(), Arc::clone(&session));

    tracing::info!(
        user_id = %auth.user_id,
        session_id = %session.session_id,
        "portal session started"
    );

    Ok(Json(ApiOk {
        data: session_info(&session),
    }))
}

pub async fn current_session(
    State(_state): State<AppState>,
    ctx: SessionContext,
) -> Result<Json<ApiOk<SessionInfo>>, ApiError> {
    Ok(Json(ApiOk {
        data: session_info(&ctx.session),
    }))
}

pub async fn end_session(
    State(state): State<AppState>,
    SignOutContext(auth): SignOutContext,
) -> Result<Json<OkResponse>, ApiError> {
    let session = state
        .sessions
        .end(&auth.token_hash)
        .ok_or_else(|| ApiError::NotFound("NO_SESSION", "no active portal session".into()))?;

    tracing::info!(
        user_id = %session.user_id,
        session_id = %session.session_id,
        "portal session ended"
    );

    Ok(Json(OkResponse::ok()))
}
