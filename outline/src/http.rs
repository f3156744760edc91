//! HTTP transport for reorder commits against a `coursedeck` server.

use serde::Serialize;

use crate::commit::{CommitTransport, ReorderRequest, TransportError};
use crate::model::{ApiResponse, PositionUpdate};

const SESSION_COOKIE: &str = "session_token";

#[derive(Serialize)]
struct ReorderBody<'a> {
    items: &'a [PositionUpdate],
}

/// Sends reorder commits to the admin structure endpoints.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    session_token: String,
}

impl HttpTransport {
    #[must_use]
    pub fn new(base_url: &str, session_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            session_token: session_token.into(),
        }
    }

    pub(crate) fn endpoint(&self, request: &ReorderRequest) -> String {
        match request {
            ReorderRequest::Chapters { course_id, .. } => {
                format!("{}/api/admin/courses/{course_id}/chapters/order", self.base_url)
            }
            ReorderRequest::Lessons { course_id, chapter_id, .. } => {
                format!("{}/api/admin/courses/{course_id}/chapters/{chapter_id}/lessons/order", self.base_url)
            }
        }
    }
}

#[async_trait::async_trait]
impl CommitTransport for HttpTransport {
    async fn send(&self, request: &ReorderRequest) -> Result<ApiResponse, TransportError> {
        let resp = self
            .client
            .put(self.endpoint(request))
            .header(reqwest::header::COOKIE, format!("{SESSION_COOKIE}={}", self.session_token))
            .json(&ReorderBody { items: request.items() })
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        // Error statuses still carry an `ApiResponse` body.
        let status = resp.status();
        let body = resp.text().await.map_err(|e| TransportError(e.to_string()))?;
        serde_json::from_str::<ApiResponse>(&body)
            .map_err(|_| TransportError(format!("unexpected response ({status}): {body}")))
    }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
