use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::models::{ApiOk, AppState};

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: &'static str,
    pub active_sessions: usize,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub async fn health(State(state): State<AppState>) -> Json<ApiOk<HealthData>> {
    Json(ApiOk {
        data: HealthData {
            status: "ok",
            active_sessions: state.sessions.len(),
        },
    })
}
