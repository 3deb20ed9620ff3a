// src/routes/notification_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::{
    error::ApiError,
    middleware::auth_context::SessionContext,
    models::{ApiOk, AppState, UnreadCountData},
    notifications::{
        LoadOptions,
        store::{LoadOutcome, NotificationSnapshot},
    },
};

const MAX_PAGE_LIMIT: u32 = 200;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_notifications))
        .route("/load", post(load_notifications))
        .route("/mark-all-read", put(mark_all_read))
        .route("/{notification_id}/read", put(mark_read))
        .route("/{notification_id}", delete(remove_notification))
}

#[derive(Debug, Serialize)]
pub struct LoadData {
    pub result: LoadOutcome,
    pub feed: NotificationSnapshot,
}

fn unread(ctx: &SessionContext) -> Json<ApiOk<UnreadCountData>> {
    Json(ApiOk {
        data: UnreadCountData {
            unread_count: ctx.session.store.unread_count(),
        },
    })
}

/* ============================================================
   GET /notifications
   ============================================================ */

pub async fn get_notifications(
    State(_state): State<AppState>,
    ctx: SessionContext,
) -> Result<Json<ApiOk<NotificationSnapshot>>, ApiError> {
    Ok(Json(ApiOk {
        data: ctx.session.store.snapshot(),
    }))
}

/* ============================================================
   POST /notifications/load?limit=&category=&priority=&unreadOnly=&search=
   ============================================================ */

pub async fn load_notifications(
    State(state): State<AppState>,
    ctx: SessionContext,
    Query(mut q): Query<LoadOptions>,
) -> Result<Json<ApiOk<LoadData>>, ApiError> {
    let limit = q.limit.unwrap_or(state.page_limit);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("limit must be between 1 and {MAX_PAGE_LIMIT}"),
        ));
    }
    q.limit = Some(limit);

    let result = ctx.session.store.load(&q).await?;

    Ok(Json(ApiOk {
        data: LoadData {
            result,
            feed: ctx.session.store.snapshot(),
        },
    }))
}

/* ============================================================
   Mutations
   ============================================================ */

pub async fn mark_read(
    State(_state): State<AppState>,
    ctx: SessionContext,
    Path(notification_id): Path<String>,
) -> Result<Json<ApiOk<UnreadCountData>>, ApiError> {
    ctx.session.store.mark_read(&notification_id).await?;
    Ok(unread(&ctx))
}

pub async fn mark_all_read(
    State(_state): State<AppState>,
    ctx: SessionContext,
) -> Result<Json<ApiOk<UnreadCountData>>, ApiError> {
    ctx.session.store.mark_all_read().await?;
    Ok(unread(&ctx))
}

pub async fn remove_notification(
    State(_state): State<AppState>,
    ctx: SessionContext,
    Path(notification_id): Path<String>,
) -> Result<Json<ApiOk<UnreadCountData>>, ApiError> {
    ctx.session.store.remove(&notification_id).await?;
    Ok(unread(&ctx))
}
