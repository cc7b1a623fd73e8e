use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Remote dispatch error: {0}")]
    Dispatch(String),

    #[error("Upload forwarding error: {0}")]
    Forward(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingField(_) => StatusCode::BAD_REQUEST,
            RelayError::Storage(_) | RelayError::Dispatch(_) | RelayError::Forward(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
