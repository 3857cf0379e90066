use axum::{extract::State, response::IntoResponse, Json};
use serde_json::Value;
use crate::state::AppState;
use crate::api::extractors::{
    auth::AuthUser,
    rejection::{AppJson, AppQuery},
};
use crate::api::dtos::{
    requests::{ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, VerifyEmailQuery},
    responses::{ApiResponse, LoginResponse},
};
use crate::domain::services::user_service::{RegisterOutcome, SettingsDocument};
use crate::error::AppError;
use std::sync::Arc;

pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.user_service
        .register(&payload.name, &payload.email, &payload.password)
        .await?;

    let response = match outcome {
        RegisterOutcome::Created(profile) => ApiResponse {
            success: true,
            data: Some(profile),
            message: Some("Registration successful. Please check your email to verify your account.".into()),
        },
        RegisterOutcome::VerificationResent => ApiResponse {
            success: true,
            data: None,
            message: Some("A verification email has been resent. Please check your inbox.".into()),
        },
    };
    Ok(Json(response))
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<VerifyEmailQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.user_service.verify_email(&query.token).await?;
    Ok(Json(ApiResponse::message("Email verified successfully. You can now log in.")))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.user_service.login(&payload.email, &payload.password).await?;
    Ok(Json(ApiResponse::ok(LoginResponse { token: result.token, user: result.user })))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.user_service.forgot_password(&payload.email).await?;
    Ok(Json(ApiResponse::message("If the email is registered, a reset link has been sent.")))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.user_service.reset_password(&payload.token, &payload.new_password).await?;
    Ok(Json(ApiResponse::message("Password has been reset successfully.")))
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.user_service.profile(caller.user_id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

pub async fn get_preferences(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let doc = state.user_service.settings(caller.user_id, SettingsDocument::Preferences).await?;
    Ok(Json(ApiResponse::ok(doc)))
}

pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    AppJson(payload): AppJson<Value>,
) -> Result<impl IntoResponse, AppError> {
    let doc = state.user_service
        .replace_settings(caller.user_id, SettingsDocument::Preferences, payload)
        .await?;
    Ok(Json(ApiResponse::ok(doc)))
}

pub async fn get_notification_settings(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let doc = state.user_service.settings(caller.user_id, SettingsDocument::NotificationSettings).await?;
    Ok(Json(ApiResponse::ok(doc)))
}

pub async fn update_notification_settings(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    AppJson(payload): AppJson<Value>,
) -> Result<impl IntoResponse, AppError> {
    let doc = state.user_service
        .replace_settings(caller.user_id, SettingsDocument::NotificationSettings, payload)
        .await?;
    Ok(Json(ApiResponse::ok(doc)))
}
