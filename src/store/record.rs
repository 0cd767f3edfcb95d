//! Survey records and the enumerator session they are captured under.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One captured citizen declaration.
///
/// `payload`, `verification` and `receipt` are opaque to the queue and are
/// forwarded to the server exactly as captured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SurveyRecord {
    pub id: String,
    pub payload: Value,
    pub verification: Value,
    pub receipt: Value,
    pub synced: bool,
    pub created_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl SurveyRecord {
    /// Build a fresh pending record with a new UUID v4 id.
    pub fn capture(payload: Value, verification: Value, receipt: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            verification,
            receipt,
            synced: false,
            created_at: Utc::now(),
            synced_at: None,
        }
    }

    /// Value of a top-level payload field rendered for display, if present.
    pub fn payload_field(&self, key: &str) -> Option<String> {
        match self.payload.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Typed form of the fields an enumerator declares for a citizen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CitizenDeclaration {
    pub name: String,
    pub age: String,
    pub guardian: String,
    pub sex: String,
    pub caste: String,
    pub income: String,
    pub voice_note: Option<String>,
    pub photo_base64: Option<String>,
}

impl CitizenDeclaration {
    pub fn into_record(
        self,
        verification: Value,
        receipt: Value,
    ) -> Result<SurveyRecord, serde_json::Error> {
        let payload = serde_json::to_value(self)?;
        Ok(SurveyRecord::capture(payload, verification, receipt))
    }
}

/// Who is capturing data on this device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnumeratorSession {
    pub id: String,
    pub name: String,
    pub assigned_area: String,
    pub assigned_ward: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub synced: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capture_assigns_fresh_pending_ids() {
        let a = SurveyRecord::capture(json!({}), json!(null), json!(null));
        let b = SurveyRecord::capture(json!({}), json!(null), json!(null));
        assert_ne!(a.id, b.id);
        assert!(!a.synced);
        assert!(a.synced_at.is_none());
    }

    #[test]
    fn test_declaration_payload_is_camel_case() {
        let declaration = CitizenDeclaration {
            name: "Priya Nair".to_string(),
            age: "34".to_string(),
            photo_base64: Some("aGVsbG8=".to_string()),
            ..Default::default()
        };
        let record = declaration
            .into_record(json!({"confidence": 91}), json!({"status": "Anchored"}))
            .unwrap();

        assert_eq!(record.payload["name"], "Priya Nair");
        assert_eq!(record.payload["photoBase64"], "aGVsbG8=");
        assert!(record.payload["voiceNote"].is_null());
        assert_eq!(record.payload_field("age").as_deref(), Some("34"));
        assert_eq!(record.payload_field("voiceNote"), None);
    }
}
