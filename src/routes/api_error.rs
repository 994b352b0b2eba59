use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::io::ErrorKind;
use tracing::error;

use canlog::CanlogError;

#[derive(Debug)]
pub enum ApiError {
    NoActiveLog,
    Core(CanlogError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl From<CanlogError> for ApiError {
    fn from(e: CanlogError) -> Self {
        ApiError::Core(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoActiveLog => StatusCode::NOT_FOUND,
            ApiError::Core(e) => match e {
                CanlogError::SignalNotFound(_) => StatusCode::NOT_FOUND,
                CanlogError::Io(io) if io.kind() == ErrorKind::NotFound => StatusCode::NOT_FOUND,
                CanlogError::EmptySeries(_) | CanlogError::TooManyErrors { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                CanlogError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::NoActiveLog => "no log file loaded; POST /read-file first".to_string(),
            ApiError::Core(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!("{}", message);
        }
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
