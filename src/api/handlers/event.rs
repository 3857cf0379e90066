use axum::{extract::State, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::{
    auth::AuthUser,
    event_form::EventForm,
    rejection::{AppJson, AppPath},
};
use crate::api::dtos::{
    requests::UpdateEventRequest,
    responses::{ApiResponse, CreateEventResponse},
};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let events = state.event_service.get_all().await?;
    Ok(Json(ApiResponse::ok(events)))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let aggregate = state.event_service.get_by_id(id).await?;
    Ok(Json(ApiResponse::ok(aggregate)))
}

/// Multipart create. The organizer is always the caller.
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    EventForm { draft, attachments }: EventForm,
) -> Result<impl IntoResponse, AppError> {
    info!(
        "Creating event '{}' for organizer {} ({} speakers, {} faqs, {} media, {} occurrences)",
        draft.title,
        caller.user_id,
        draft.speakers.len(),
        draft.faqs.len(),
        draft.media.len(),
        draft.occurrences.len()
    );

    let created = state.event_service.create_event(caller.user_id, draft, attachments).await?;
    let event = &created.aggregate.event;

    Ok(Json(CreateEventResponse {
        cover_image_url: Some(event.cover_image.clone()).filter(|url| !url.is_empty()),
        vibe_video_url: event.vibe_video_url.clone(),
        event_id: event.id,
        media_urls: created.inline_media_urls,
    }))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updated = state.event_service.update(&caller, id, payload.into_patch()).await?;
    Ok(Json(ApiResponse::ok(updated)))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.event_service.delete(&caller, id).await?;
    Ok(Json(ApiResponse::message("Event deleted successfully")))
}
