use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use drivelink_core::{AppState, Refusal};

use crate::envelope;
use crate::extract::JsonBody;
use crate::render;

pub fn public_router(app: Arc<AppState>) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/exlink/{id}", get(view_link_page))
        .route("/api/exlink/{id}", get(view_link_json))
        .with_state(app)
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    link_uuid: Option<String>,
}

fn refusal_status(refusal: &Refusal) -> StatusCode {
    match refusal {
        Refusal::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    }
}

fn log_refusal(link: &str, refusal: &Refusal) {
    match refusal {
        Refusal::Storage(err) => tracing::error!(link, error = %err, "link lookup failed"),
        Refusal::MalformedExpiry => {}
        Refusal::ProviderConfig(err) => {
            tracing::warn!(link, reason = refusal.code(), error = %err, "link refused")
        }
        _ => tracing::info!(link, reason = refusal.code(), "link refused"),
    }
}

async fn login(
    State(app): State<Arc<AppState>>,
    JsonBody(body): JsonBody<LoginBody>,
) -> Response {
    let token = body.token.unwrap_or_default();
    if token.trim().is_empty() {
        return envelope::fail(StatusCode::OK, Refusal::MissingToken.to_string());
    }
    let link_uuid = body.link_uuid.unwrap_or_default();

    match app.engine.redeem(&link_uuid, &token).await {
        Ok(redemption) => (
            StatusCode::OK,
            Json(json!({
                "status": true,
                "remaining": redemption.remaining,
                "accounted": redemption.accounted,
            })),
        )
            .into_response(),
        Err(refusal) => {
            log_refusal(&link_uuid, &refusal);
            envelope::fail(refusal_status(&refusal), refusal.to_string())
        }
    }
}

async fn view_link_page(State(app): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let (status, page) = match app.engine.view(&id).await {
        Ok(view) => (StatusCode::OK, render::view_page(&view)),
        Err(refusal) => {
            log_refusal(&id, &refusal);
            (
                refusal_status(&refusal),
                render::error_page(&refusal.to_string()),
            )
        }
    };
    match page {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => envelope::internal(err, envelope::GENERIC_FAILURE),
    }
}

async fn view_link_json(State(app): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match app.engine.view(&id).await {
        Ok(view) => match serde_json::to_value(&view) {
            Ok(data) => envelope::ok_with_message(data, "外链访问成功"),
            Err(err) => envelope::internal(err, envelope::GENERIC_FAILURE),
        },
        Err(refusal) => {
            log_refusal(&id, &refusal);
            envelope::fail(refusal_status(&refusal), refusal.to_string())
        }
    }
}
