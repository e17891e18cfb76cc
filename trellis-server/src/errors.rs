use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use trellis_core::TaskError;
use trellis_model::FieldViolation;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    /// Per-field messages carried by 422 responses.
    violations: Vec<FieldViolation>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            violations: Vec::new(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unprocessable(violations: Vec<FieldViolation>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "validation failed".to_string(),
            violations,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut error = json!({
            "message": self.message,
            "status": self.status.as_u16(),
        });

        if !self.violations.is_empty() {
            let mut errors = serde_json::Map::new();
            for violation in &self.violations {
                errors
                    .entry(violation.field.clone())
                    .or_insert_with(|| json!([]))
                    .as_array_mut()
                    .expect("errors entries are arrays")
                    .push(json!(violation.message));
            }
            error["errors"] = serde_json::Value::Object(errors);
        }

        (self.status, Json(json!({ "error": error }))).into_response()
    }
}

impl From<TaskError> for AppError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Forbidden => {
                Self::forbidden("you are not allowed to access this task")
            }
            TaskError::NotFound(what) => {
                Self::not_found(format!("{what} not found"))
            }
            TaskError::Validation(violations) => {
                Self::unprocessable(violations)
            }
            TaskError::Conflict(detail) => Self::conflict(detail),
            TaskError::Database(err) => {
                tracing::error!(error = %err, "database error");
                Self::internal("internal server error")
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}
