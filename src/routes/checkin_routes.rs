// src/routes/checkin_routes.rs

use axum::{Json, Router, extract::State, routing::post};
use serde::Serialize;
use serde_json::Value;

use crate::{
    backend::CheckinSubmission,
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState},
    risk::{HealthDeclaration, RiskAssessment, RiskTier, assess},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_checkin))
        .route("/score", post(score_checkin))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResult {
    #[serde(flatten)]
    pub assessment: RiskAssessment,
    pub submitted: bool,
}

/// Scores without submitting, for the form's live preview.
/// The body is read leniently: unknown or malformed fields score nothing.
pub async fn score_checkin(
    State(_state): State<AppState>,
    _auth: AuthContext,
    Json(body): Json<Value>,
) -> Result<Json<ApiOk<RiskAssessment>>, ApiError> {
    let declaration = HealthDeclaration::from_value(&body);
    Ok(Json(ApiOk {
        data: assess(&declaration),
    }))
}

pub async fn submit_checkin(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<Value>,
) -> Result<Json<ApiOk<CheckinResult>>, ApiError> {
    let declaration = HealthDeclaration::from_value(&body);
    let assessment = assess(&declaration);

    state
        .backend
        .with_token(&auth.token)
        .submit_checkin(&CheckinSubmission::new(&declaration, assessment))
        .await?;

    if assessment.tier >= RiskTier::High {
        tracing::warn!(
            user_id = %auth.user_id,
            score = assessment.score,
            tier = assessment.tier.as_str(),
            "check-in flagged for clinician review"
        );
    } else {
        tracing::info!(
            user_id = %auth.user_id,
            tier = assessment.tier.as_str(),
            "check-in submitted"
        );
    }

    Ok(Json(ApiOk {
        data: CheckinResult {
            assessment,
            submitted: true,
        },
    }))
}
