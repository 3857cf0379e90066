use std::sync::Arc;
use chrono::Utc;
use tracing::{info, warn, error};

use crate::domain::{
    models::{
        auth::Principal,
        event::{validate_commercials, validate_occurrences, validate_schedule, Event, EventAggregate, EventPatch, MediaType, NewEvent},
        upload::{EventAttachments, Upload, UploadFolder},
    },
    ports::{EventRepository, FileStore},
};
use crate::error::AppError;

/// Result of creating an event: the persisted aggregate plus the URLs of
/// loose inline media stored alongside it, in upload order.
#[derive(Debug)]
pub struct CreatedEvent {
    pub aggregate: EventAggregate,
    pub inline_media_urls: Vec<String>,
}

pub struct EventService {
    repo: Arc<dyn EventRepository>,
    files: Arc<dyn FileStore>,
}

impl EventService {
    pub fn new(repo: Arc<dyn EventRepository>, files: Arc<dyn FileStore>) -> Self {
        Self { repo, files }
    }

    pub async fn create_event(
        &self,
        organizer_id: i64,
        mut draft: NewEvent,
        attachments: EventAttachments,
    ) -> Result<CreatedEvent, AppError> {
        draft.validate()?;

        let mut written = Vec::new();
        let inline_media_urls = match self.store_attachments(&mut draft, attachments, &mut written).await {
            Ok(urls) => urls,
            Err(e) => {
                error!("Attachment upload failed, event not created: {}", e);
                self.discard(&written).await;
                return Err(e);
            }
        };

        match self.repo.create_aggregate(organizer_id, &draft).await {
            Ok(aggregate) => {
                info!(
                    event_id = aggregate.event.id,
                    organizer_id,
                    speakers = aggregate.speakers.len(),
                    faqs = aggregate.faqs.len(),
                    media = aggregate.media.len(),
                    occurrences = aggregate.occurrences.len(),
                    "Event created"
                );
                Ok(CreatedEvent { aggregate, inline_media_urls })
            }
            Err(e) => {
                self.discard(&written).await;
                Err(e)
            }
        }
    }

    async fn store_attachments(
        &self,
        draft: &mut NewEvent,
        attachments: EventAttachments,
        written: &mut Vec<String>,
    ) -> Result<Vec<String>, AppError> {
        if let Some(cover) = attachments.cover_image {
            draft.cover_image = self.save(&cover, UploadFolder::Covers, written).await?;
        }
        if let Some(video) = attachments.vibe_video {
            draft.vibe_video_url = Some(self.save(&video, UploadFolder::Videos, written).await?);
        }

        for (idx, upload) in attachments.media_files.into_iter().enumerate() {
            let Some(upload) = upload else { continue };
            let Some(media) = draft.media.get_mut(idx) else {
                warn!("Media file {} has no matching media descriptor, ignoring", idx);
                continue;
            };
            let folder = match media.media_type {
                MediaType::Image => UploadFolder::MediaImages,
                MediaType::Video => UploadFolder::MediaVideos,
            };
            media.media_url = self.save(&upload, folder, written).await?;
        }

        for (idx, upload) in attachments.speaker_photos.into_iter().enumerate() {
            let Some(upload) = upload else { continue };
            let Some(speaker) = draft.speakers.get_mut(idx) else {
                warn!("Speaker photo {} has no matching speaker, ignoring", idx);
                continue;
            };
            speaker.photo_url = Some(self.save(&upload, UploadFolder::SpeakerPhotos, written).await?);
        }

        let mut inline_urls = Vec::with_capacity(attachments.inline_media.len());
        for upload in &attachments.inline_media {
            inline_urls.push(self.save(upload, UploadFolder::InlineMedia, written).await?);
        }
        Ok(inline_urls)
    }

    async fn save(&self, upload: &Upload, folder: UploadFolder, written: &mut Vec<String>) -> Result<String, AppError> {
        let url = self.files.store(&upload.bytes, &upload.file_name, folder).await?;
        written.push(url.clone());
        Ok(url)
    }

    async fn discard(&self, urls: &[String]) {
        for url in urls {
            if let Err(e) = self.files.remove(url).await {
                warn!("Failed to remove orphaned upload {}: {}", url, e);
            }
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<EventAggregate, AppError> {
        self.repo.find_aggregate(id).await?
            .ok_or_else(|| AppError::NotFound("Event not found".into()))
    }

    pub async fn get_all(&self) -> Result<Vec<Event>, AppError> {
        self.repo.list().await
    }

    pub async fn update(&self, caller: &Principal, id: i64, patch: EventPatch) -> Result<Event, AppError> {
        let mut event = self.repo.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
        ensure_can_modify(caller, &event)?;

        if let Some(val) = patch.title {
            if val.trim().is_empty() {
                return Err(AppError::Validation("Title is required".into()));
            }
            event.title = val;
        }
        if let Some(val) = patch.category { event.category = val; }
        if let Some(val) = patch.description { event.description = val; }
        if let Some(val) = patch.cover_image { event.cover_image = val; }
        if let Some(val) = patch.vibe_video_url { event.vibe_video_url = val; }
        if let Some(val) = patch.event_type { event.event_type = val; }
        if let Some(val) = patch.location { event.location = val; }
        if let Some(val) = patch.registration_deadline { event.registration_deadline = val; }
        if let Some(val) = patch.event_start { event.event_start = val; }
        if let Some(val) = patch.event_end { event.event_end = val; }
        if let Some(val) = patch.recurrence_type { event.recurrence_type = val; }
        if let Some(val) = patch.is_paid_event { event.is_paid_event = val; }
        if let Some(val) = patch.price { event.price = val; }
        if let Some(val) = patch.max_attendees { event.max_attendees = val; }
        if let Some(val) = patch.status { event.status = val; }
        if let Some(val) = patch.organizer_email { event.organizer_email = val; }

        if caller.is_admin() {
            if let Some(val) = patch.is_verified_by_admin {
                event.admin_verified_at = if val { Some(Utc::now()) } else { None };
                event.is_verified_by_admin = val;
            }
            if let Some(val) = patch.admin_comments { event.admin_comments = val; }
        } else if patch.is_verified_by_admin.is_some() || patch.admin_comments.is_some() {
            warn!(user_id = caller.user_id, "Ignoring admin workflow fields from non-admin caller");
        }

        validate_schedule(event.event_start, event.event_end)?;
        validate_commercials(event.price, event.max_attendees)?;
        if let Some(occurrences) = &patch.occurrences {
            validate_occurrences(occurrences)?;
        }

        event.updated_at = Utc::now().max(event.updated_at);

        let updated = self.repo.update(&event, patch.occurrences.as_deref()).await?;
        info!(event_id = id, "Event updated");
        Ok(updated)
    }

    pub async fn delete(&self, caller: &Principal, id: i64) -> Result<(), AppError> {
        let event = self.repo.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
        ensure_can_modify(caller, &event)?;

        self.repo.delete(id).await?;
        info!(event_id = id, "Event deleted");
        Ok(())
    }
}

fn ensure_can_modify(caller: &Principal, event: &Event) -> Result<(), AppError> {
    if caller.user_id == event.organizer_id || caller.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the organizer can modify this event".into()))
    }
}
