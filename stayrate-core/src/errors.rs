//! Error taxonomy for StayRate operations.
//!
//! Every subsystem maps its failures into these semantic kinds so that the
//! transport layer can derive a status class and a response body without
//! inspecting provider internals. Business-rule violations carry structured
//! payloads that serialize to the JSON bodies the operator UI drives its
//! payment and grouping flows from.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured business-rule violation, serialized as the client-facing body.
///
/// `{"code": "LIMIT_EXCEEDED", "currentCount": 9, "maxAllowed": 10, ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum BusinessRuleViolation {
    /// Trial tenants may hold at most `max_allowed` properties.
    #[serde(rename = "LIMIT_EXCEEDED")]
    #[serde(rename_all = "camelCase")]
    LimitExceeded {
        current_count: u32,
        max_allowed: u32,
        requires_payment: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        attempted_import: Option<u32>,
    },
    /// Group members must sit within `max_distance` meters of the template.
    #[serde(rename = "GEO_FENCING_VIOLATION")]
    #[serde(rename_all = "camelCase")]
    GeoFencingViolation {
        /// Great-circle distance to the group template, in meters.
        distance: u32,
        max_distance: u32,
    },
}

impl std::fmt::Display for BusinessRuleViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusinessRuleViolation::LimitExceeded {
                current_count,
                max_allowed,
                ..
            } => write!(
                f,
                "property limit exceeded: {current_count} held, {max_allowed} allowed during trial"
            ),
            BusinessRuleViolation::GeoFencingViolation {
                distance,
                max_distance,
            } => write!(
                f,
                "geo-fencing violation: {distance}m from group template, max {max_distance}m"
            ),
        }
    }
}

/// Semantic error kinds shared by every StayRate subsystem.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Client-provided data fails a constraint.
    #[error("validation failed on {field}: {message}")]
    Validation { field: String, message: String },

    /// Caller is not in the team or lacks the required role.
    #[error("forbidden: {0}")]
    Authorization(String),

    /// Entity missing.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Duplicate resource or violated uniqueness.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Business rule rejected the operation; body round-trips to the client.
    #[error("{0}")]
    BusinessRule(BusinessRuleViolation),

    /// A PMS, payment, or AI provider failed; the reason is preserved for
    /// logs but never leaks verbatim to clients.
    #[error("{provider} error: {reason}")]
    RemoteProvider { provider: String, reason: String },

    /// Misconfiguration that must abort the process at startup.
    #[error("fatal configuration error: {0}")]
    Fatal(String),
}

impl CoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn remote(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::RemoteProvider {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status class the transport layer should respond with.
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::Validation { .. } => 400,
            CoreError::Authorization(_) => 403,
            CoreError::NotFound { .. } => 404,
            CoreError::Conflict(_) => 409,
            CoreError::BusinessRule(_) => 403,
            CoreError::RemoteProvider { .. } => 502,
            CoreError::Fatal(_) => 500,
        }
    }

    /// Client-facing JSON body. Business-rule violations round-trip their
    /// structured payload; everything else gets a generic message.
    pub fn client_body(&self) -> serde_json::Value {
        match self {
            CoreError::BusinessRule(violation) => {
                serde_json::to_value(violation).unwrap_or_else(|_| {
                    serde_json::json!({ "error": "business rule violation" })
                })
            }
            CoreError::Validation { field, message } => {
                serde_json::json!({ "error": format!("{field}: {message}") })
            }
            CoreError::NotFound { entity } => {
                serde_json::json!({ "error": format!("{entity} not found") })
            }
            CoreError::RemoteProvider { provider, .. } => {
                serde_json::json!({ "error": format!("{provider} is unavailable") })
            }
            _ => serde_json::json!({ "error": "request failed" }),
        }
    }
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_exceeded_serializes_structured_body() {
        let violation = BusinessRuleViolation::LimitExceeded {
            current_count: 9,
            max_allowed: 10,
            requires_payment: true,
            attempted_import: Some(3),
        };
        let body = serde_json::to_value(&violation).unwrap();
        assert_eq!(body["code"], "LIMIT_EXCEEDED");
        assert_eq!(body["currentCount"], 9);
        assert_eq!(body["maxAllowed"], 10);
        assert_eq!(body["requiresPayment"], true);
        assert_eq!(body["attemptedImport"], 3);
    }

    #[test]
    fn geo_fencing_serializes_distances() {
        let violation = BusinessRuleViolation::GeoFencingViolation {
            distance: 2600,
            max_distance: 500,
        };
        let body = serde_json::to_value(&violation).unwrap();
        assert_eq!(body["code"], "GEO_FENCING_VIOLATION");
        assert_eq!(body["distance"], 2600);
        assert_eq!(body["maxDistance"], 500);
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(CoreError::validation("capacity", "must be >= 1").status_code(), 400);
        assert_eq!(CoreError::Authorization("not in team".into()).status_code(), 403);
        assert_eq!(CoreError::NotFound { entity: "property" }.status_code(), 404);
        assert_eq!(CoreError::remote("smoobu", "500").status_code(), 502);
    }

    #[test]
    fn provider_internals_never_reach_the_client() {
        let err = CoreError::remote("stripe", "sk_live key rejected by upstream");
        let body = err.client_body();
        assert_eq!(body["error"], "stripe is unavailable");
    }
}
