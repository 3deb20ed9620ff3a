// src/backend.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BackendError;
use crate::notifications::api::NotificationApi;
use crate::notifications::{LoadOptions, Notification};
use crate::risk::{HealthDeclaration, RiskAssessment, RiskTier};

/// Shared HTTP client for the clinic backend. Cheap to clone.
#[derive(Clone, Debug)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Binds the client to one caller's bearer token.
    pub fn with_token(&self, token: &str) -> AuthedBackend {
        AuthedBackend {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: token.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthedBackend {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct NotificationPage {
    #[serde(default)]
    notifications: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnreadCountBody {
    unread_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinSubmission<'a> {
    pub declaration: &'a HealthDeclaration,
    pub risk_score: u32,
    pub risk_tier: RiskTier,
}

impl<'a> CheckinSubmission<'a> {
    pub fn new(declaration: &'a HealthDeclaration, assessment: RiskAssessment) -> Self {
        Self {
            declaration,
            risk_score: assessment.score,
            risk_tier: assessment.tier,
        }
    }
}

impl AuthedBackend {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/notifications/{id}[/suffix]` with the id percent-encoded as one
    /// path segment.
    fn notification_url(&self, id: &str, suffix: Option<&str>) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| BackendError::InvalidUrl(self.base_url.clone()))?;
            segments.pop_if_empty().push("notifications").push(id);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let res = request.bearer_auth(&self.token).send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: for<'de> Deserialize<'de>>(res: Response) -> Result<T, BackendError> {
        let text = res.text().await?;
        serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
    }

    pub async fn submit_checkin(&self, submission: &CheckinSubmission<'_>) -> Result<(), BackendError> {
        self.send(self.http.post(self.url("/checkins")).json(submission))
            .await?;
        Ok(())
    }
}

/// Entries that do not decode are skipped instead of failing the whole page.
fn decode_page(page: NotificationPage) -> Vec<Notification> {
    page.notifications
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<Notification>(raw) {
            Ok(n) => Some(n.normalized()),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed notification from backend");
                None
            }
        })
        .collect()
}

#[async_trait]
impl NotificationApi for AuthedBackend {
    async fn list(&self, options: &LoadOptions) -> Result<Vec<Notification>, BackendError> {
        let request = self
            .http
            .get(self.url("/notifications"))
            .query(&options.query_pairs());
        let res = self.send(request).await?;
        let page: NotificationPage = Self::decode(res).await?;
        Ok(decode_page(page))
    }

    async fn unread_count(&self) -> Result<u64, BackendError> {
        let res = self
            .send(self.http.get(self.url("/notifications/unread-count")))
            .await?;
        let body: UnreadCountBody = Self::decode(res).await?;
        Ok(body.unread_count)
    }

    async fn mark_read(&self, id: &str) -> Result<(), BackendError> {
        let url = self.notification_url(id, Some("read"))?;
        self.send(self.http.put(url)).await?;
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), BackendError> {
        self.send(self.http.put(self.url("/notifications/mark-all-read")))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), BackendError> {
        let url = self.notification_url(id, None)?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = BackendClient::new("http://backend.local/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.with_token("t").url("/notifications"),
            "http://backend.local/api/notifications"
        );
    }

    #[test]
    fn test_notification_ids_are_encoded_as_one_segment() {
        let backend = BackendClient::new("http://backend.local/api/", Duration::from_secs(5))
            .unwrap()
            .with_token("t");

        let url = backend.notification_url("a/b?c#d", Some("read")).unwrap();
        assert_eq!(url.as_str(), "http://backend.local/api/notifications/a%2Fb%3Fc%23d/read");

        let url = backend.notification_url("n-42", None).unwrap();
        assert_eq!(url.as_str(), "http://backend.local/api/notifications/n-42");
    }

    #[test]
    fn test_unparseable_base_url_is_reported() {
        let backend = BackendClient::new("not a url", Duration::from_secs(5))
            .unwrap()
            .with_token("t");
        assert!(matches!(
            backend.notification_url("n-1", None),
            Err(BackendError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_decode_page_skips_malformed_entries() {
        let page: NotificationPage = serde_json::from_value(json!({
            "notifications": [
                {
                    "id": "ok",
                    "title": "Appointment moved",
                    "message": "Now at 10:30",
                    "category": "appointment",
                    "priority": "medium",
                    "isRead": true,
                    "createdAt": "2026-04-10T12:00:00Z",
                    "actionRequired": false,
                    "actionUrl": "/appointments/5"
                },
                { "id": "broken", "category": "spam" }
            ]
        }))
        .unwrap();

        let decoded = decode_page(page);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].id, "ok");
        assert_eq!(decoded[0].action_url, None);
    }

    #[test]
    fn test_missing_notifications_key_is_empty_page() {
        let page: NotificationPage = serde_json::from_value(json!({})).unwrap();
        assert!(decode_page(page).is_empty());
    }

    #[test]
    fn test_checkin_submission_shape() {
        let declaration = HealthDeclaration::default();
        let submission = CheckinSubmission::new(
            &declaration,
            RiskAssessment {
                score: 7,
                tier: RiskTier::High,
            },
        );
        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(value["riskScore"], json!(7));
        assert_eq!(value["riskTier"], json!("high"));
        assert_eq!(value["declaration"]["covid"]["hasSymptoms"], json!(false));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let client = BackendClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = client.with_token("t").unread_count().await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
