//! Wire types exchanged with the page context
//!
//! Requests carry a `type` and free-form `params`; each response echoes
//! the request id and holds either a `result` or an `error` string.

use crate::field_detection::{FieldCandidate, FieldCounts, FieldKind};
use crate::page::{ElementId, Rect};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Request kinds understood by the page agent
pub mod kinds {
    pub const PING: &str = "ping";
    pub const DETECT_FIELDS: &str = "detectFields";
    /// Answered once at least one password field exists
    pub const AWAIT_FIELDS: &str = "awaitFields";
    pub const FILL_PASSWORD: &str = "fillPassword";
    pub const FILL_USERNAME: &str = "fillUsername";
    pub const GET_USERNAME: &str = "getUsername";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRequest {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: Value,
}

impl PageRequest {
    pub fn new(kind: &str, params: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageResponse {
    pub fn success(id: Uuid, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Uuid, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
        }
    }
}

/// Unsolicited notices from the page to the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PageEvent {
    FieldsChanged { counts: FieldCounts },
}

// ===== Params =====

#[derive(Debug, Deserialize)]
pub struct FillPasswordParams {
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct FillUsernameParams {
    pub username: String,
}

// ===== Results =====

/// A field as reported across the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub element: ElementId,
    pub kind: FieldKind,
    pub rect: Rect,
    pub priority: i32,
}

impl From<&FieldCandidate> for FieldSummary {
    fn from(candidate: &FieldCandidate) -> Self {
        Self {
            element: candidate.element,
            kind: candidate.kind,
            rect: candidate.rect,
            priority: candidate.priority,
        }
    }
}

/// Result of `detectFields` and `awaitFields`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectReport {
    pub counts: FieldCounts,
    #[serde(default)]
    pub password_fields: Vec<FieldSummary>,
    #[serde(default)]
    pub username: Option<FieldSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_params() {
        let id = Uuid::new_v4();
        let req: PageRequest =
            serde_json::from_value(json!({"id": id, "type": "ping"})).unwrap();
        assert_eq!(req.kind, kinds::PING);
        assert_eq!(req.params, Value::Null);
    }

    #[test]
    fn test_response_omits_missing_parts() {
        let id = Uuid::new_v4();
        let ok = serde_json::to_value(PageResponse::success(id, json!(true))).unwrap();
        assert!(ok.get("error").is_none());

        let err = serde_json::to_value(PageResponse::failure(id, "bad params")).unwrap();
        assert!(err.get("result").is_none());
        assert_eq!(err["error"], "bad params");
    }

    #[test]
    fn test_fields_changed_event_shape() {
        let event = PageEvent::FieldsChanged {
            counts: FieldCounts {
                password_fields: 1,
                username_fields: 0,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "fieldsChanged");
        assert_eq!(json["counts"]["password_fields"], 1);
    }
}
