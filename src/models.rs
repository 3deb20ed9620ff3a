use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::backend::BackendClient;
use crate::notifications::ConnectionState;
use crate::notifications::store::StorePolicy;
use crate::session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub backend: BackendClient,
    pub sessions: SessionRegistry,
    pub push_url: String,
    pub push_timeout: Duration,
    pub page_limit: u32,
    pub store_policy: StorePolicy,
}

/* -------------------------
   API DTOs
--------------------------*/

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub data: OkData,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        OkResponse {
            data: OkData { ok: true },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub connection_state: ConnectionState,
    pub unread_count: u64,
    /// Why the initial notification fetch failed, if it did.
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountData {
    pub unread_count: u64,
}
