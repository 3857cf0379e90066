use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};
use tracing::warn;

use crate::domain::models::event::{
    EventPatch, EventStatus, EventType, MediaType, NewFaq, NewMedia, NewOccurrence, NewSpeaker,
    RecurrenceType,
};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Accepts RFC 3339 as well as the offset-less forms browsers submit from
/// `datetime-local` inputs. Offset-less values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub mod flexible_datetime {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }
}

pub mod flexible_datetime_opt {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw))),
            _ => Ok(None),
        }
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`). Pair with `#[serde(default)]`.
pub mod nullable {
    use super::*;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

// Sub-entity payloads embedded as JSON strings in the event form. Keys are
// accepted in camelCase or PascalCase; ids and event ids are never read.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerInput {
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Bio")]
    pub bio: String,
    #[serde(default, alias = "PhotoUrl")]
    pub photo_url: Option<String>,
    #[serde(default, alias = "SocialLinks")]
    pub social_links: Option<String>,
}

impl From<SpeakerInput> for NewSpeaker {
    fn from(input: SpeakerInput) -> Self {
        Self {
            name: input.name,
            bio: input.bio,
            photo_url: input.photo_url.filter(|url| !url.trim().is_empty()),
            social_links: input.social_links,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqInput {
    #[serde(default, alias = "Question")]
    pub question: String,
    #[serde(default, alias = "Answer")]
    pub answer: String,
}

impl From<FaqInput> for NewFaq {
    fn from(input: FaqInput) -> Self {
        Self { question: input.question, answer: input.answer }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInput {
    #[serde(default, alias = "MediaUrl")]
    pub media_url: String,
    #[serde(default, alias = "MediaType")]
    pub media_type: Option<String>,
    #[serde(default, alias = "Description")]
    pub description: Option<String>,
    #[serde(default, alias = "IsActive")]
    pub is_active: Option<bool>,
}

impl From<MediaInput> for NewMedia {
    fn from(input: MediaInput) -> Self {
        Self {
            media_url: input.media_url,
            media_type: MediaType::parse_or_image(input.media_type.as_deref()),
            description: input.description,
            is_active: input.is_active.unwrap_or(true),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceInput {
    #[serde(alias = "StartTime", deserialize_with = "flexible_datetime::deserialize")]
    pub start_time: DateTime<Utc>,
    #[serde(alias = "EndTime", deserialize_with = "flexible_datetime::deserialize")]
    pub end_time: DateTime<Utc>,
    #[serde(default, alias = "EventTitle")]
    pub event_title: Option<String>,
}

impl From<OccurrenceInput> for NewOccurrence {
    fn from(input: OccurrenceInput) -> Self {
        Self {
            start_time: input.start_time,
            end_time: input.end_time,
            event_title: input.event_title.filter(|t| !t.trim().is_empty()),
        }
    }
}

/// JSON body of `PUT /api/events/{id}`. Absent fields keep their stored value;
/// an explicit `null` clears a nullable column.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(default, alias = "Title")]
    pub title: Option<String>,
    #[serde(default, alias = "Category")]
    pub category: Option<String>,
    #[serde(default, alias = "Description")]
    pub description: Option<String>,
    #[serde(default, alias = "CoverImage")]
    pub cover_image: Option<String>,
    #[serde(default, alias = "VibeVideoUrl", deserialize_with = "nullable::deserialize")]
    pub vibe_video_url: Option<Option<String>>,
    #[serde(default, alias = "EventType")]
    pub event_type: Option<String>,
    #[serde(default, alias = "Location", deserialize_with = "nullable::deserialize")]
    pub location: Option<Option<String>>,
    #[serde(default, alias = "RegistrationDeadline", deserialize_with = "flexible_datetime_opt::deserialize")]
    pub registration_deadline: Option<DateTime<Utc>>,
    #[serde(default, alias = "EventStart", deserialize_with = "flexible_datetime_opt::deserialize")]
    pub event_start: Option<DateTime<Utc>>,
    #[serde(default, alias = "EventEnd", deserialize_with = "flexible_datetime_opt::deserialize")]
    pub event_end: Option<DateTime<Utc>>,
    #[serde(default, alias = "RecurrenceType")]
    pub recurrence_type: Option<String>,
    #[serde(default, alias = "IsPaidEvent")]
    pub is_paid_event: Option<bool>,
    #[serde(default, alias = "Price", deserialize_with = "nullable::deserialize")]
    pub price: Option<Option<f64>>,
    #[serde(default, alias = "MaxAttendees", deserialize_with = "nullable::deserialize")]
    pub max_attendees: Option<Option<i32>>,
    #[serde(default, alias = "Status")]
    pub status: Option<EventStatus>,
    #[serde(default, alias = "OrganizerEmail", deserialize_with = "nullable::deserialize")]
    pub organizer_email: Option<Option<String>>,
    #[serde(default, alias = "IsVerifiedByAdmin")]
    pub is_verified_by_admin: Option<bool>,
    #[serde(default, alias = "AdminComments", deserialize_with = "nullable::deserialize")]
    pub admin_comments: Option<Option<String>>,
    #[serde(default, alias = "Occurrences")]
    pub occurrences: Option<Vec<OccurrenceInput>>,
}

impl UpdateEventRequest {
    pub fn into_patch(self) -> EventPatch {
        EventPatch {
            title: self.title,
            category: self.category,
            description: self.description,
            cover_image: self.cover_image,
            vibe_video_url: self.vibe_video_url,
            event_type: self.event_type.as_deref().and_then(|raw| {
                let parsed = EventType::parse_lenient(raw);
                if parsed.is_none() {
                    warn!("Ignoring unknown event type '{}'", raw);
                }
                parsed
            }),
            location: self.location,
            registration_deadline: self.registration_deadline,
            event_start: self.event_start,
            event_end: self.event_end,
            recurrence_type: self.recurrence_type.as_deref().and_then(|raw| {
                let parsed = RecurrenceType::parse_lenient(raw);
                if parsed.is_none() {
                    warn!("Ignoring unknown recurrence type '{}'", raw);
                }
                parsed
            }),
            is_paid_event: self.is_paid_event,
            price: self.price,
            max_attendees: self.max_attendees,
            status: self.status,
            organizer_email: self.organizer_email,
            is_verified_by_admin: self.is_verified_by_admin,
            admin_comments: self.admin_comments,
            occurrences: self.occurrences.map(|list| list.into_iter().map(NewOccurrence::from).collect()),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Email")]
    pub email: String,
    #[serde(alias = "Password")]
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(alias = "Email")]
    pub email: String,
    #[serde(alias = "Password")]
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[serde(alias = "Email")]
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(alias = "Token")]
    pub token: String,
    #[serde(alias = "NewPassword", alias = "password")]
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}
