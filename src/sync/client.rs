//! Remote Submission Client interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::store::SurveyRecord;

/// What the coordinator sends for one pending record.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub id: String,
    pub payload: Value,
    pub verification: Value,
    pub receipt: Value,
    pub created_at: DateTime<Utc>,
}

impl From<&SurveyRecord> for SubmissionRequest {
    fn from(record: &SurveyRecord) -> Self {
        Self {
            id: record.id.clone(),
            payload: record.payload.clone(),
            verification: record.verification.clone(),
            receipt: record.receipt.clone(),
            created_at: record.created_at,
        }
    }
}

/// Three-way classification of a single submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The server stored the record.
    Accepted,
    /// The server already holds this id; an idempotent replay.
    AlreadyExists,
    /// Transport error, timeout, or server-side rejection.
    Failed(String),
}

/// Anything that can deliver a survey to the census server.
///
/// Implementations never error: every failure is folded into
/// [`SubmissionOutcome::Failed`].
#[async_trait]
pub trait SubmissionClient: Send + Sync {
    async fn submit(&self, request: &SubmissionRequest) -> SubmissionOutcome;
}
