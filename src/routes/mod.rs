use crate::models::AppState;
use axum::Router;

pub mod checkin_routes;
pub mod health_routes;
pub mod notification_routes;
pub mod session_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/session", session_routes::router())
        .nest("/api/v1/notifications", notification_routes::router())
        .nest("/api/v1/checkin", checkin_routes::router())
        .merge(health_routes::router())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::Duration;

    use crate::backend::BackendClient;
    use crate::models::AppState;
    use crate::notifications::store::StorePolicy;
    use crate::session::SessionRegistry;

    /// State whose backend and push endpoints refuse connections.
    pub fn unreachable_state() -> AppState {
        AppState {
            backend: BackendClient::new("http://127.0.0.1:1", Duration::from_secs(2))
                .expect("client builds"),
            sessions: SessionRegistry::default(),
            push_url: "ws://127.0.0.1:1/push".to_string(),
            push_timeout: Duration::from_secs(2),
            page_limit: 50,
            store_policy: StorePolicy::default(),
        }
    }
}
