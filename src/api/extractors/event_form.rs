use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequest, Multipart, Request};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api::dtos::requests::{parse_timestamp, FaqInput, MediaInput, OccurrenceInput, SpeakerInput};
use crate::config::SubArrayPolicy;
use crate::domain::models::{
    event::{EventType, NewEvent, NewFaq, NewMedia, NewOccurrence, NewSpeaker, RecurrenceType},
    upload::{EventAttachments, Upload},
};
use crate::error::AppError;
use crate::state::AppState;

// Positional uploads beyond this index are dropped rather than allocated.
const MAX_INDEXED_UPLOADS: usize = 256;

/// A multipart event submission turned into a draft plus its files.
pub struct EventForm {
    pub draft: NewEvent,
    pub attachments: EventAttachments,
}

impl<S> FromRequest<S> for EventForm
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let policy = <Arc<AppState> as FromRef<S>>::from_ref(state).config.sub_array_policy;

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::from_rejection(e.status(), e.body_text()))?;

        let mut form = RawEventForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::from_rejection(e.status(), e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if let Some(file_name) = field.file_name().map(str::to_string) {
                let bytes = field.bytes().await.map_err(|e| AppError::from_rejection(e.status(), e.body_text()))?;
                if bytes.is_empty() {
                    debug!("Skipping empty file field '{}'", name);
                    continue;
                }
                form.add_file(&name, Upload { file_name, bytes: bytes.to_vec() });
            } else {
                let text = field.text().await.map_err(|e| AppError::from_rejection(e.status(), e.body_text()))?;
                form.add_text(&name, text);
            }
        }

        let draft = form.to_draft(policy)?;
        Ok(EventForm { draft, attachments: form.attachments })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum FileSlot {
    Cover,
    VibeVideo,
    MediaFile(usize),
    SpeakerPhoto(usize),
    Inline,
}

impl FileSlot {
    fn classify(field_name: &str) -> Option<Self> {
        let name = normalize(field_name);
        match name.as_str() {
            "coverimage" => return Some(FileSlot::Cover),
            "vibevideo" => return Some(FileSlot::VibeVideo),
            "media" => return Some(FileSlot::Inline),
            _ => {}
        }
        if let Some((idx, rest)) = indexed(&name, "media[") {
            return (rest == ".mediafile").then_some(FileSlot::MediaFile(idx));
        }
        if let Some((idx, rest)) = indexed(&name, "mediafiles[") {
            return rest.is_empty().then_some(FileSlot::MediaFile(idx));
        }
        if let Some((idx, rest)) = indexed(&name, "speakers[") {
            return (rest == ".image" || rest == ".photo").then_some(FileSlot::SpeakerPhoto(idx));
        }
        None
    }
}

// Field names compare case-insensitively and ignore underscores, so
// `EventStart`, `eventStart` and `event_start` are the same field.
fn normalize(field_name: &str) -> String {
    field_name.trim().chars().filter(|c| *c != '_').collect::<String>().to_ascii_lowercase()
}

/// Splits `prefix{N}]rest` into `(N, rest)`.
fn indexed<'a>(name: &'a str, prefix: &str) -> Option<(usize, &'a str)> {
    let tail = name.strip_prefix(prefix)?;
    let (idx, rest) = tail.split_once(']')?;
    Some((idx.parse().ok()?, rest))
}

fn put_at(slots: &mut Vec<Option<Upload>>, idx: usize, upload: Upload) {
    if idx >= MAX_INDEXED_UPLOADS {
        warn!("Ignoring upload at index {}", idx);
        return;
    }
    if slots.len() <= idx {
        slots.resize_with(idx + 1, || None);
    }
    slots[idx] = Some(upload);
}

/// Text fields (keyed by normalized name) and files collected from the form.
#[derive(Debug, Default)]
pub struct RawEventForm {
    fields: HashMap<String, String>,
    pub attachments: EventAttachments,
}

impl RawEventForm {
    pub fn add_text(&mut self, name: &str, value: String) {
        self.fields.insert(normalize(name), value);
    }

    pub fn add_file(&mut self, name: &str, upload: Upload) {
        match FileSlot::classify(name) {
            Some(FileSlot::Cover) => self.attachments.cover_image = Some(upload),
            Some(FileSlot::VibeVideo) => self.attachments.vibe_video = Some(upload),
            Some(FileSlot::MediaFile(idx)) => put_at(&mut self.attachments.media_files, idx, upload),
            Some(FileSlot::SpeakerPhoto(idx)) => put_at(&mut self.attachments.speaker_photos, idx, upload),
            Some(FileSlot::Inline) => self.attachments.inline_media.push(upload),
            None => warn!("Ignoring unexpected file field '{}'", name),
        }
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    fn timestamp(&self, key: &str, label: &str) -> Result<Option<chrono::DateTime<chrono::Utc>>, AppError> {
        match self.text(key) {
            None => Ok(None),
            Some(raw) => parse_timestamp(raw)
                .map(Some)
                .ok_or_else(|| AppError::Validation(format!("Invalid {}: '{}'", label, raw))),
        }
    }

    /// Builds the draft from the text fields. `OrganizerId` and any ids inside
    /// the JSON collections are not read.
    pub fn to_draft(&self, policy: SubArrayPolicy) -> Result<NewEvent, AppError> {
        let event_start = self.timestamp("eventstart", "EventStart")?
            .ok_or_else(|| AppError::Validation("EventStart is required".into()))?;
        let event_end = self.timestamp("eventend", "EventEnd")?
            .ok_or_else(|| AppError::Validation("EventEnd is required".into()))?;
        let registration_deadline = self.timestamp("registrationdeadline", "RegistrationDeadline")?
            .unwrap_or(event_start);

        let event_type = match self.text("eventtype") {
            None => EventType::default(),
            Some(raw) => EventType::parse_lenient(raw).unwrap_or_else(|| {
                warn!("Unknown event type '{}', defaulting to {:?}", raw, EventType::default());
                EventType::default()
            }),
        };
        let recurrence_type = match self.text("recurrencetype") {
            None => RecurrenceType::default(),
            Some(raw) => RecurrenceType::parse_lenient(raw).unwrap_or_else(|| {
                warn!("Unknown recurrence type '{}', defaulting to {:?}", raw, RecurrenceType::default());
                RecurrenceType::default()
            }),
        };

        let is_paid_event = match self.text("ispaidevent") {
            None => false,
            Some(raw) => parse_bool(raw)
                .ok_or_else(|| AppError::Validation(format!("Invalid IsPaidEvent: '{}'", raw)))?,
        };
        let price = self.text("price")
            .map(|raw| raw.parse::<f64>().map_err(|_| AppError::Validation(format!("Invalid Price: '{}'", raw))))
            .transpose()?;
        let max_attendees = self.text("maxattendees")
            .map(|raw| raw.parse::<i32>().map_err(|_| AppError::Validation(format!("Invalid MaxAttendees: '{}'", raw))))
            .transpose()?;

        let speakers = parse_collection::<SpeakerInput>("Speakers", self.text("speakers"), policy)?;
        let faqs = parse_collection::<FaqInput>("Faqs", self.text("faqs"), policy)?;
        let media = parse_collection::<MediaInput>("Media", self.text("media"), policy)?;
        let occurrences = parse_collection::<OccurrenceInput>("Occurrences", self.text("occurrences"), policy)?;

        Ok(NewEvent {
            title: self.text("title").unwrap_or_default().to_string(),
            category: self.text("category").unwrap_or_default().to_string(),
            description: self.text("description").unwrap_or_default().to_string(),
            cover_image: self.text("coverimage").unwrap_or_default().to_string(),
            vibe_video_url: self.text("vibevideourl").map(str::to_string),
            event_type,
            location: self.text("location").map(str::to_string),
            registration_deadline,
            event_start,
            event_end,
            recurrence_type,
            is_paid_event,
            price,
            max_attendees,
            organizer_email: self.text("organizeremail").map(str::to_string),
            speakers: speakers.into_iter().map(NewSpeaker::from).collect(),
            faqs: faqs.into_iter().map(NewFaq::from).collect(),
            media: media.into_iter().map(NewMedia::from).collect(),
            occurrences: occurrences.into_iter().map(NewOccurrence::from).collect(),
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Some(true),
        "false" | "off" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Decodes a JSON array carried in a single form field. Blank, missing and
/// `null` values are empty collections; malformed JSON follows `policy`.
pub fn parse_collection<T: DeserializeOwned>(
    field: &str,
    raw: Option<&str>,
    policy: SubArrayPolicy,
) -> Result<Vec<T>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Option<Vec<T>>>(raw) {
        Ok(items) => Ok(items.unwrap_or_default()),
        Err(e) => match policy {
            SubArrayPolicy::Strict => Err(AppError::Validation(format!("Invalid JSON in field '{}': {}", field, e))),
            SubArrayPolicy::Lenient => {
                warn!("Invalid JSON in field '{}', continuing without it: {}", field, e);
                Ok(Vec::new())
            }
        },
    }
}
