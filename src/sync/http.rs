//! HTTP submission client for the census backend.
//!
//! Posts one survey per request to `{base_url}/surveys` and folds the
//! response into a [`SubmissionOutcome`].

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use super::client::{SubmissionClient, SubmissionOutcome, SubmissionRequest};
use crate::utils::truncate_text;

/// Longest slice of a server error body kept in a failure reason.
const MAX_REASON_BYTES: usize = 200;

pub struct HttpSubmissionClient {
    client: Client,
    endpoint: String,
}

impl HttpSubmissionClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("census-field/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/surveys", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Wire body: declared fields at top level plus the pass-through blocks.
fn request_body(request: &SubmissionRequest) -> Value {
    let mut body = match &request.payload {
        Value::Object(fields) => fields.clone(),
        Value::Null => Map::new(),
        other => {
            let mut fields = Map::new();
            fields.insert("payload".to_string(), other.clone());
            fields
        }
    };
    body.insert("id".to_string(), Value::String(request.id.clone()));
    body.insert("aiVerification".to_string(), request.verification.clone());
    body.insert("blockchainReceipt".to_string(), request.receipt.clone());
    body.insert(
        "createdAt".to_string(),
        Value::String(request.created_at.to_rfc3339()),
    );
    Value::Object(body)
}

/// The reference backend answers a replayed id with
/// `400 {"detail": "Survey with this ID already exists"}`.
fn reports_duplicate(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .and_then(Value::as_str)
                .map(|detail| detail.to_lowercase().contains("already exists"))
        })
        .unwrap_or(false)
}

fn classify(status: StatusCode, body: &str) -> SubmissionOutcome {
    if status.is_success() {
        SubmissionOutcome::Accepted
    } else if status == StatusCode::CONFLICT
        || (status == StatusCode::BAD_REQUEST && reports_duplicate(body))
    {
        SubmissionOutcome::AlreadyExists
    } else {
        SubmissionOutcome::Failed(format!(
            "HTTP {}: {}",
            status.as_u16(),
            truncate_text(body.trim(), MAX_REASON_BYTES)
        ))
    }
}

#[async_trait]
impl SubmissionClient for HttpSubmissionClient {
    async fn submit(&self, request: &SubmissionRequest) -> SubmissionOutcome {
        debug!(survey_id = %request.id, "POST {}", self.endpoint);

        let response = match self
            .client
            .post(&self.endpoint)
            .json(&request_body(request))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return SubmissionOutcome::Failed(format!("request timed out: {e}"))
            }
            Err(e) => return SubmissionOutcome::Failed(format!("cannot reach server: {e}")),
        };

        let status = response.status();
        if status.is_success() {
            return SubmissionOutcome::Accepted;
        }
        let body = response.text().await.unwrap_or_default();
        classify(status, &body)
    }
}
