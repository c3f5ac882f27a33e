use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

/// When set, 5xx responses carry the underlying error message and a debug
/// rendering of the cause chain. Off by default so production never leaks it.
static EXPOSE_ERROR_DETAILS: AtomicBool = AtomicBool::new(false);

pub fn expose_error_details(enabled: bool) {
    EXPOSE_ERROR_DETAILS.store(enabled, Ordering::Relaxed);
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    #[error("Invalid input: {}", .0.iter().map(|e| e.msg.as_str()).collect::<Vec<_>>().join(", "))]
    InvalidInput(Vec<FieldError>),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Forbidden: {0}")]
    Forbidden(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Service Unavailable")]
    ServiceUnavailable,

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

/// One entry of the `errors` array in the error envelope.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl FieldError {
    pub fn new(param: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            param: Some(param.into()),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

/// Flatten nested validator output into `param`/`msg` pairs.
///
/// Nested structs are addressed as `parent.child`, list entries as
/// `parent[index].child`.
pub fn flatten_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect_validation_errors(errors, None, &mut out);
    out.sort_by(|a, b| a.param.cmp(&b.param));
    out
}

fn collect_validation_errors(
    errors: &ValidationErrors,
    prefix: Option<&str>,
    out: &mut Vec<FieldError>,
) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(p) => format!("{}.{}", p, field),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let msg = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", err.code));
                    out.push(FieldError::new(path.clone(), msg));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                collect_validation_errors(inner, Some(&path), out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    let item_path = format!("{}[{}]", path, index);
                    collect_validation_errors(inner, Some(&item_path), out);
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            success: bool,
            message: String,
            errors: Vec<FieldError>,
            #[serde(skip_serializing_if = "Option::is_none")]
            stack: Option<String>,
        }

        let expose = EXPOSE_ERROR_DETAILS.load(Ordering::Relaxed);

        let (status, message, errors, stack) = match self {
            AppError::ValidationError(err) => (
                StatusCode::BAD_REQUEST,
                "Validation Error".to_string(),
                flatten_validation_errors(&err),
                None,
            ),
            AppError::InvalidInput(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation Error".to_string(),
                errors,
                None,
            ),
            AppError::BadRequest(err) => (StatusCode::BAD_REQUEST, err.to_string(), vec![], None),
            AppError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string(), vec![], None),
            AppError::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err.to_string(), vec![], None),
            AppError::Forbidden(err) => (StatusCode::FORBIDDEN, err.to_string(), vec![], None),
            AppError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
                vec![],
                None,
            ),
            AppError::InternalError(err)
            | AppError::DatabaseError(err)
            | AppError::ConfigError(err) => {
                tracing::error!(error = ?err, "Request failed with an internal error");
                if expose {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        err.to_string(),
                        vec![],
                        Some(format!("{:#?}", err)),
                    )
                } else {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                        vec![],
                        None,
                    )
                }
            }
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                message,
                errors,
                stack,
            }),
        )
            .into_response()
    }
}
