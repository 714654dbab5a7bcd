//! Error taxonomy shared by every desk operation.
//!
//! Each variant maps to exactly one HTTP status in the `ResponseError` impl below,
//! so handlers can return `DeskError` directly and clients can tell
//! "not allowed" apart from "not now" and "does not exist".

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use serde::Serialize;
use std::collections::BTreeMap;

pub type DeskResult<T> = Result<T, DeskError>;

#[derive(Debug)]
pub enum DeskError {
    /// Malformed or out-of-range input. `details` maps field name to message.
    Validation {
        message: String,
        details: BTreeMap<String, String>,
    },
    /// Referenced entity does not exist, e.g. "ticket".
    NotFound(&'static str),
    /// Caller is authenticated but lacks the capability.
    Forbidden(String),
    /// Operation is not legal from the ticket's current status.
    InvalidState(String),
    /// The precondition held but another actor won the race.
    Conflict(String),
    /// The ticket already carries a rating.
    AlreadyRated { ticket_id: i32 },
    /// Attached image ids that do not exist.
    ImageNotFound { missing: Vec<i32> },
    /// Store failure. Never shown to the caller.
    Database(DbErr),
    /// Any other unexpected failure. Never shown to the caller.
    Internal(String),
}

impl DeskError {
    /// Validation failure on a single field.
    pub fn invalid_field(field: &str, message: &str) -> Self {
        let mut details = BTreeMap::new();
        details.insert(field.to_owned(), message.to_owned());
        Self::validation(details)
    }

    pub fn validation(details: BTreeMap<String, String>) -> Self {
        DeskError::Validation {
            message: "Field validation failed".to_owned(),
            details,
        }
    }

    /// Stable machine-readable tag for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            DeskError::Validation { .. } => "validation",
            DeskError::NotFound(_) => "not_found",
            DeskError::Forbidden(_) => "forbidden",
            DeskError::InvalidState(_) => "invalid_state",
            DeskError::Conflict(_) => "conflict",
            DeskError::AlreadyRated { .. } => "already_rated",
            DeskError::ImageNotFound { .. } => "image_not_found",
            DeskError::Database(_) | DeskError::Internal(_) => "internal",
        }
    }
}

impl std::fmt::Display for DeskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeskError::Validation { message, details } => write!(f, "{}: {:?}", message, details),
            DeskError::NotFound(resource) => write!(f, "Not found: {}", resource),
            DeskError::Forbidden(reason) => write!(f, "Forbidden: {}", reason),
            DeskError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            DeskError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            DeskError::AlreadyRated { ticket_id } => {
                write!(f, "Ticket {} has already been rated", ticket_id)
            }
            DeskError::ImageNotFound { missing } => write!(f, "Images not found: {:?}", missing),
            DeskError::Database(e) => write!(f, "Database error: {}", e),
            DeskError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DeskError {}

impl From<DbErr> for DeskError {
    fn from(e: DbErr) -> Self {
        DeskError::Database(e)
    }
}

impl From<serde_json::Error> for DeskError {
    fn from(e: serde_json::Error) -> Self {
        DeskError::Internal(format!("Serialization failed: {}", e))
    }
}

impl From<validator::ValidationErrors> for DeskError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .iter()
                    .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .or_else(|| errs.first().map(|e| e.code.to_string()))
                    .unwrap_or_else(|| "invalid".to_owned());
                (field.to_string(), message)
            })
            .collect();
        DeskError::validation(details)
    }
}

/// True when the store rejected a write because of a unique constraint.
pub fn is_unique_violation(err: &DbErr) -> bool {
    let msg = err.to_string();
    msg.contains("duplicate key") || msg.contains("23505") || msg.contains("UNIQUE constraint")
}

/// True when the store rejected a write that referenced a missing row.
pub fn is_foreign_key_violation(err: &DbErr) -> bool {
    let msg = err.to_string();
    msg.contains("violates foreign key constraint") || msg.contains("23503")
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl ResponseError for DeskError {
    fn status_code(&self) -> StatusCode {
        match self {
            DeskError::Validation { .. } => StatusCode::BAD_REQUEST,
            DeskError::ImageNotFound { .. } => StatusCode::BAD_REQUEST,
            DeskError::NotFound(_) => StatusCode::NOT_FOUND,
            DeskError::Forbidden(_) => StatusCode::FORBIDDEN,
            DeskError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DeskError::Conflict(_) => StatusCode::CONFLICT,
            DeskError::AlreadyRated { .. } => StatusCode::CONFLICT,
            DeskError::Database(_) | DeskError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            DeskError::Validation { message, details } => ErrorBody {
                code: self.code(),
                error: message.clone(),
                details: serde_json::to_value(details).ok(),
                correlation_id: None,
            },
            DeskError::ImageNotFound { missing } => ErrorBody {
                code: self.code(),
                error: "Some images do not exist".to_owned(),
                details: Some(serde_json::json!({ "missing_image_ids": missing })),
                correlation_id: None,
            },
            DeskError::NotFound(resource) => ErrorBody {
                code: self.code(),
                error: format!("{} not found", resource),
                details: None,
                correlation_id: None,
            },
            DeskError::Forbidden(reason) => ErrorBody {
                code: self.code(),
                error: reason.clone(),
                details: None,
                correlation_id: None,
            },
            DeskError::InvalidState(msg) | DeskError::Conflict(msg) => ErrorBody {
                code: self.code(),
                error: msg.clone(),
                details: None,
                correlation_id: None,
            },
            DeskError::AlreadyRated { .. } => ErrorBody {
                code: self.code(),
                error: "This ticket has already been rated".to_owned(),
                details: None,
                correlation_id: None,
            },
            DeskError::Database(_) | DeskError::Internal(_) => {
                let correlation_id = uuid::Uuid::new_v4().to_string();
                log::error!("[{}] {}", correlation_id, self);
                ErrorBody {
                    code: self.code(),
                    error: "Internal server error".to_owned(),
                    details: None,
                    correlation_id: Some(correlation_id),
                }
            }
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_distinguish_retry_classes() {
        assert_eq!(
            DeskError::Forbidden("no".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            DeskError::NotFound("ticket").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DeskError::InvalidState("closed".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            DeskError::Conflict("taken".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DeskError::AlreadyRated { ticket_id: 1 }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DeskError::ImageNotFound { missing: vec![3] }.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = DeskError::Database(DbErr::Exec("relation \"tickets\" is locked".into()));
        assert_eq!(err.code(), "internal");
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unique_violation_detection() {
        let err = DbErr::Exec(
            "error returned from database: duplicate key value violates unique constraint \"ratings_ticket_id_key\"".into(),
        );
        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&DbErr::Exec("connection reset".into())));
    }

    #[test]
    fn test_foreign_key_violation_detection() {
        let err = DbErr::Exec(
            "error returned from database: insert or update on table \"ticket_images\" violates foreign key constraint \"ticket_images_image_id_fkey\"".into(),
        );
        assert!(is_foreign_key_violation(&err));
        assert!(!is_foreign_key_violation(&DbErr::Exec("duplicate key value".into())));
    }

    #[test]
    fn test_invalid_field_details() {
        match DeskError::invalid_field("body", "required") {
            DeskError::Validation { details, .. } => {
                assert_eq!(details.get("body").map(String::as_str), Some("required"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
