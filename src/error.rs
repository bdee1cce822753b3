//! Service error taxonomy and its HTTP mapping.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use sea_orm::{DbErr, SqlErr};

/// Errors returned by the service layer.
#[derive(Debug, Display)]
pub enum ServiceError {
    #[display(fmt = "{}", _0)]
    Validation(String),
    #[display(fmt = "Login required")]
    Unauthorized,
    #[display(fmt = "Permission denied")]
    Forbidden,
    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "{}", _0)]
    Gone(String),
    #[display(fmt = "Database error: {}", _0)]
    Database(DbErr),
    #[display(fmt = "Storage error: {}", _0)]
    Storage(String),
    #[display(fmt = "{}", _0)]
    Internal(String),
    /// Any of the above plus an htmx event name sent back in `HX-Trigger`.
    #[display(fmt = "{}", source)]
    Triggered {
        source: Box<ServiceError>,
        trigger: String,
    },
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Attach an htmx event, e.g. `username-dont-exist`.
    pub fn with_trigger(self, trigger: impl Into<String>) -> Self {
        ServiceError::Triggered {
            source: Box::new(self),
            trigger: trigger.into(),
        }
    }

    /// htmx event name attached to the response, if any.
    pub fn trigger(&self) -> Option<&str> {
        match self {
            ServiceError::Triggered { trigger, .. } => Some(trigger),
            ServiceError::Unauthorized => Some("login-required"),
            _ => None,
        }
    }

    /// The underlying error with any trigger removed.
    pub fn kind(&self) -> &ServiceError {
        match self {
            ServiceError::Triggered { source, .. } => source.kind(),
            other => other,
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<DbErr> for ServiceError {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => ServiceError::Conflict(msg),
            _ => ServiceError::Database(e),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(e: validator::ValidationErrors) -> Self {
        ServiceError::Validation(e.to_string())
    }
}

impl From<crate::storage::StorageError> for ServiceError {
    fn from(e: crate::storage::StorageError) -> Self {
        use crate::storage::StorageError;
        match e {
            StorageError::Invalid(msg) => ServiceError::Validation(msg),
            StorageError::NotFound(_) => ServiceError::NotFound("File"),
            StorageError::Io(_) => ServiceError::Storage(e.to_string()),
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Gone(_) => StatusCode::GONE,
            ServiceError::Database(_) | ServiceError::Storage(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::Triggered { source, .. } => source.status_code(),
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut res = HttpResponse::build(status);

        if status.is_server_error() {
            log::error!("{}", self);
        }
        // A bare login requirement must not swap the target element.
        if let ServiceError::Unauthorized = self {
            res.insert_header(("HX-Reswap", "none"));
        }
        if let Some(trigger) = self.trigger() {
            res.insert_header(("HX-Trigger", trigger.to_owned()));
        }

        let message = if status.is_server_error() {
            "Internal server error".to_owned()
        } else {
            self.to_string()
        };
        res.json(serde_json::json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ServiceError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServiceError::NotFound("Vote").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::Conflict("dup".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Gone("late".into()).status_code(),
            StatusCode::GONE
        );
    }

    #[test]
    fn test_unauthorized_headers() {
        let res = ServiceError::Unauthorized.error_response();
        assert_eq!(res.headers().get("HX-Reswap").unwrap(), "none");
        assert_eq!(res.headers().get("HX-Trigger").unwrap(), "login-required");
    }

    #[test]
    fn test_trigger_keeps_inner_status() {
        let err = ServiceError::Conflict("taken".into()).with_trigger("nickname-already-exists");
        let res = err.error_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(
            res.headers().get("HX-Trigger").unwrap(),
            "nickname-already-exists"
        );
        assert!(res.headers().get("HX-Reswap").is_none());
        assert!(matches!(err.kind(), ServiceError::Conflict(_)));
    }
}
