use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::warn;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum EventType {
    #[default]
    Online,
    Venue,
    #[serde(rename = "TBA")]
    #[sqlx(rename = "TBA")]
    Tba,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum RecurrenceType {
    #[default]
    Once,
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum EventStatus {
    #[default]
    Draft,
    Published,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

impl EventType {
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "online" | "0" => Some(EventType::Online),
            "venue" | "1" => Some(EventType::Venue),
            "tba" | "2" => Some(EventType::Tba),
            _ => None,
        }
    }
}

impl RecurrenceType {
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "once" | "0" => Some(RecurrenceType::Once),
            "daily" | "1" => Some(RecurrenceType::Daily),
            "weekly" | "2" => Some(RecurrenceType::Weekly),
            "monthly" | "3" => Some(RecurrenceType::Monthly),
            _ => None,
        }
    }
}

impl MediaType {
    /// Unknown kinds are treated as images.
    pub fn parse_or_image(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "video" || s == "1" => MediaType::Video,
            Some(s) if s == "image" || s == "0" || s.is_empty() => MediaType::Image,
            Some(other) => {
                warn!("Unknown media type '{}', defaulting to Image", other);
                MediaType::Image
            }
            None => MediaType::Image,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "eventId")]
    pub id: i64,
    pub organizer_id: i64,
    pub title: String,
    pub category: String,
    pub description: String,
    pub cover_image: String,
    pub vibe_video_url: Option<String>,
    pub event_type: EventType,
    pub location: Option<String>,
    pub registration_deadline: DateTime<Utc>,
    pub event_start: DateTime<Utc>,
    pub event_end: DateTime<Utc>,
    pub recurrence_type: RecurrenceType,
    pub is_paid_event: bool,
    pub price: Option<f64>,
    pub max_attendees: Option<i32>,
    pub is_verified_by_admin: bool,
    pub admin_verified_at: Option<DateTime<Utc>>,
    pub admin_comments: Option<String>,
    pub status: EventStatus,
    pub organizer_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventSpeaker {
    #[serde(rename = "speakerId")]
    pub id: i64,
    pub event_id: i64,
    pub name: String,
    pub bio: String,
    pub photo_url: Option<String>,
    pub social_links: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventFaq {
    #[serde(rename = "faqId")]
    pub id: i64,
    pub event_id: i64,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventMedia {
    #[serde(rename = "mediaId")]
    pub id: i64,
    pub event_id: i64,
    pub media_url: String,
    pub media_type: MediaType,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventOccurrence {
    #[serde(rename = "occurrenceId")]
    pub id: i64,
    pub event_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub event_title: Option<String>,
}

/// An event together with every child collection it owns.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventAggregate {
    #[serde(flatten)]
    pub event: Event,
    pub speakers: Vec<EventSpeaker>,
    pub faqs: Vec<EventFaq>,
    pub media: Vec<EventMedia>,
    pub occurrences: Vec<EventOccurrence>,
}

// Draft types. None of them carries an identity: ids and event ids are
// assigned by the store when the aggregate is inserted.

#[derive(Debug, Clone, Default)]
pub struct NewSpeaker {
    pub name: String,
    pub bio: String,
    pub photo_url: Option<String>,
    pub social_links: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewFaq {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewMedia {
    pub media_url: String,
    pub media_type: MediaType,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewOccurrence {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub event_title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub category: String,
    pub description: String,
    pub cover_image: String,
    pub vibe_video_url: Option<String>,
    pub event_type: EventType,
    pub location: Option<String>,
    pub registration_deadline: DateTime<Utc>,
    pub event_start: DateTime<Utc>,
    pub event_end: DateTime<Utc>,
    pub recurrence_type: RecurrenceType,
    pub is_paid_event: bool,
    pub price: Option<f64>,
    pub max_attendees: Option<i32>,
    pub organizer_email: Option<String>,
    pub speakers: Vec<NewSpeaker>,
    pub faqs: Vec<NewFaq>,
    pub media: Vec<NewMedia>,
    pub occurrences: Vec<NewOccurrence>,
}

impl NewEvent {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".into()));
        }
        validate_schedule(self.event_start, self.event_end)?;
        validate_commercials(self.price, self.max_attendees)?;
        validate_occurrences(&self.occurrences)
    }
}

pub fn validate_schedule(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if end <= start {
        return Err(AppError::Validation("Event end must be after event start".into()));
    }
    Ok(())
}

pub fn validate_commercials(price: Option<f64>, max_attendees: Option<i32>) -> Result<(), AppError> {
    if let Some(price) = price {
        if !price.is_finite() || price < 0.0 {
            return Err(AppError::Validation("Price must be a non-negative number".into()));
        }
    }
    if let Some(max) = max_attendees {
        if max <= 0 {
            return Err(AppError::Validation("MaxAttendees must be positive".into()));
        }
    }
    Ok(())
}

pub fn validate_occurrences(occurrences: &[NewOccurrence]) -> Result<(), AppError> {
    for (idx, occ) in occurrences.iter().enumerate() {
        if occ.end_time <= occ.start_time {
            return Err(AppError::Validation(format!(
                "Occurrence {} must end after it starts",
                idx
            )));
        }
    }
    Ok(())
}

/// Partial update of an event's scalar fields. For nullable columns the outer
/// `Option` says whether the field was sent, the inner one is the new value.
/// Occurrences, when present, replace the stored collection.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub vibe_video_url: Option<Option<String>>,
    pub event_type: Option<EventType>,
    pub location: Option<Option<String>>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub event_start: Option<DateTime<Utc>>,
    pub event_end: Option<DateTime<Utc>>,
    pub recurrence_type: Option<RecurrenceType>,
    pub is_paid_event: Option<bool>,
    pub price: Option<Option<f64>>,
    pub max_attendees: Option<Option<i32>>,
    pub status: Option<EventStatus>,
    pub organizer_email: Option<Option<String>>,
    pub is_verified_by_admin: Option<bool>,
    pub admin_comments: Option<Option<String>>,
    pub occurrences: Option<Vec<NewOccurrence>>,
}
