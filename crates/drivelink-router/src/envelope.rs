//! `{status, data?, message?}` bodies shared by the public and admin routes.

use std::any::Any;
use std::fmt::Display;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value as JsonValue, json};

pub const GENERIC_FAILURE: &str = "服务器内部错误";

pub fn ok(data: JsonValue) -> Response {
    (StatusCode::OK, Json(json!({ "status": true, "data": data }))).into_response()
}

pub fn ok_message(message: &str) -> Response {
    (StatusCode::OK, Json(json!({ "status": true, "message": message }))).into_response()
}

pub fn ok_with_message(data: JsonValue, message: &str) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "status": true, "data": data, "message": message })),
    )
        .into_response()
}

pub fn fail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "status": false, "message": message.into() })),
    )
        .into_response()
}

/// Log the fault and answer with a 500 carrying `message`.
pub fn internal(err: impl Display, message: &str) -> Response {
    tracing::error!(error = %err, "{message}");
    fail(StatusCode::INTERNAL_SERVER_ERROR, message)
}

pub async fn not_found() -> Response {
    fail(StatusCode::NOT_FOUND, "接口不存在")
}

/// Body for `CatchPanicLayer::custom`.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "handler panicked");
    fail(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
}
