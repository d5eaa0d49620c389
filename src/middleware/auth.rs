use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::error::Error;
use crate::services::session::SessionContext;
use crate::AppState;

fn bearer_token(req: &Request) -> Result<&str, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"missing_authorization", "kind":"unauthorized", "retryable": false})),
        )
            .into_response());
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"bad_authorization", "kind":"unauthorized", "retryable": false})),
        )
            .into_response());
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"unsupported_scheme", "kind":"unauthorized", "retryable": false})),
        )
            .into_response());
    };
    Ok(token.trim())
}

async fn authorize(state: &AppState, token: &str) -> Result<SessionContext, Response> {
    state
        .auth_service
        .authorize(token)
        .await
        .map_err(IntoResponse::into_response)
}

/// Any signed-in administrator or approved account.
pub async fn require_session(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = match bearer_token(&req) {
        Ok(token) => token.to_string(),
        Err(resp) => return resp,
    };
    match authorize(&state, &token).await {
        Ok(context) => {
            req.extensions_mut().insert(context);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

pub async fn require_admin(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = match bearer_token(&req) {
        Ok(token) => token.to_string(),
        Err(resp) => return resp,
    };
    match authorize(&state, &token).await {
        Ok(context) if context.is_admin => {
            req.extensions_mut().insert(context);
            next.run(req).await
        }
        Ok(_) => Error::Forbidden("forbidden".to_string()).into_response(),
        Err(resp) => resp,
    }
}
