use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::auth_dto::{
        LoginRequest, LoginResponse, LogoutResponse, Notice, NoticeLevel, RegisterRequest,
        RegisterResponse, Route, SessionResponse,
    },
    error::Result,
    services::session::SessionContext,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and queued for approval", body = Json<RegisterResponse>),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered")
    )
)]
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let outcome = state
        .auth_service
        .register(&payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse::from(outcome))))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credential accepted; `route` says where to go and `session` is set only when access is granted", body = Json<LoginResponse>),
        (status = 401, description = "Invalid email or password")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let outcome = state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(LoginResponse::from(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session ended", body = Json<LogoutResponse>),
        (status = 401, description = "No valid session")
    )
)]
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<impl IntoResponse> {
    state.auth_service.logout(&session);
    Ok(Json(LogoutResponse {
        route: Route::Entry,
        notice: Notice::new(NoticeLevel::Info, "Signed out."),
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Current session", body = Json<SessionResponse>),
        (status = 401, description = "No valid session"),
        (status = 403, description = "Account no longer approved")
    )
)]
#[axum::debug_handler]
pub async fn current_session(
    Extension(session): Extension<SessionContext>,
) -> Result<impl IntoResponse> {
    Ok(Json(SessionResponse::from(session)))
}
