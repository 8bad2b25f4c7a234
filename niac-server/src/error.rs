//! Maps the shared error taxonomy onto the control plane's JSON error body
//! (`spec.md` §7): `{error, kind, details?}` with the status from
//! [`niac_types::Error::http_status`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use niac_types::{Error, ErrorDetails};
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<ErrorDetails>,
}

pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let details = match &self.0 {
            Error::ConfigInvalid { field, expected, got, suggestion } => Some(ErrorDetails {
                field: Some(field.clone()),
                expected: Some(expected.clone()),
                got: Some(got.clone()),
                suggestion: if suggestion.is_empty() { None } else { Some(suggestion.clone()) },
            }),
            _ => None,
        };
        let body = ErrorBody { error: self.0.to_string(), kind: self.0.kind(), details };
        (status, Json(body)).into_response()
    }
}
