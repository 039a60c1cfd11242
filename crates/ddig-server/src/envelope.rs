use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Uniform `{success, message, data}` response body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    pub data: Value,
}

impl Envelope {
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::fail_with(message, json!({}))
    }

    /// A failure that still carries data, e.g. the reference of a record
    /// that was stored before its notifications failed.
    pub fn fail_with(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: false,
            message: message.into(),
            data,
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Externally visible failures. Messages never carry internal error text.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Please specify an action. Available: {}", .0.join(", "))]
    UnknownAction(Vec<&'static str>),

    #[error("Invalid export type: {0}. Available: events, newsletter, contacts")]
    UnknownExportType(String),

    #[error("We could not save your submission. Please try again later.")]
    Persistence,

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("The request took too long to process. Please try again.")]
    Timeout,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::UnknownAction(_)
            | Self::UnknownExportType(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(Envelope::fail(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shape() {
        let value = serde_json::to_value(Envelope::ok("done", json!({"id": 1}))).unwrap();
        assert_eq!(value, json!({"success": true, "message": "done", "data": {"id": 1}}));
        let value = serde_json::to_value(Envelope::fail("nope")).unwrap();
        assert_eq!(value["data"], json!({}));
    }

    #[test]
    fn unknown_action_names_choices() {
        let err = ApiError::UnknownAction(vec!["contact_form", "test"]);
        assert_eq!(err.to_string(), "Please specify an action. Available: contact_form, test");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::Persistence.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::Unauthorized("Unauthorized").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ApiError::UnknownExportType("pledges".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
