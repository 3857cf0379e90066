use crate::domain::{
    models::event::{
        Event, EventAggregate, EventFaq, EventMedia, EventOccurrence, EventSpeaker, NewEvent,
        NewOccurrence,
    },
    ports::EventRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

pub struct SqliteEventRepo {
    pool: SqlitePool,
}

impl SqliteEventRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepo {
    async fn create_aggregate(&self, organizer_id: i64, draft: &NewEvent) -> Result<EventAggregate, AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let event = sqlx::query_as::<_, Event>(
            r#"INSERT INTO events (
                organizer_id, title, category, description, cover_image, vibe_video_url,
                event_type, location, registration_deadline, event_start, event_end,
                recurrence_type, is_paid_event, price, max_attendees, organizer_email,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *"#
        )
            .bind(organizer_id)
            .bind(&draft.title)
            .bind(&draft.category)
            .bind(&draft.description)
            .bind(&draft.cover_image)
            .bind(&draft.vibe_video_url)
            .bind(draft.event_type)
            .bind(&draft.location)
            .bind(draft.registration_deadline)
            .bind(draft.event_start)
            .bind(draft.event_end)
            .bind(draft.recurrence_type)
            .bind(draft.is_paid_event)
            .bind(draft.price)
            .bind(draft.max_attendees)
            .bind(&draft.organizer_email)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let mut speakers = Vec::with_capacity(draft.speakers.len());
        for speaker in &draft.speakers {
            speakers.push(
                sqlx::query_as::<_, EventSpeaker>(
                    "INSERT INTO event_speakers (event_id, name, bio, photo_url, social_links) VALUES (?, ?, ?, ?, ?) RETURNING *",
                )
                    .bind(event.id)
                    .bind(&speaker.name)
                    .bind(&speaker.bio)
                    .bind(&speaker.photo_url)
                    .bind(&speaker.social_links)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(AppError::Database)?,
            );
        }

        let mut faqs = Vec::with_capacity(draft.faqs.len());
        for faq in &draft.faqs {
            faqs.push(
                sqlx::query_as::<_, EventFaq>(
                    "INSERT INTO event_faqs (event_id, question, answer) VALUES (?, ?, ?) RETURNING *",
                )
                    .bind(event.id)
                    .bind(&faq.question)
                    .bind(&faq.answer)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(AppError::Database)?,
            );
        }

        let mut media = Vec::with_capacity(draft.media.len());
        for item in &draft.media {
            media.push(
                sqlx::query_as::<_, EventMedia>(
                    "INSERT INTO event_media (event_id, media_url, media_type, description, is_active) VALUES (?, ?, ?, ?, ?) RETURNING *",
                )
                    .bind(event.id)
                    .bind(&item.media_url)
                    .bind(item.media_type)
                    .bind(&item.description)
                    .bind(item.is_active)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(AppError::Database)?,
            );
        }

        let occurrences = insert_occurrences(&mut *tx, &event, &draft.occurrences).await?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(EventAggregate { event, speakers, faqs, media, occurrences })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Event>, AppError> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_aggregate(&self, id: i64) -> Result<Option<EventAggregate>, AppError> {
        let Some(event) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let speakers = sqlx::query_as::<_, EventSpeaker>("SELECT * FROM event_speakers WHERE event_id = ? ORDER BY id")
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        let faqs = sqlx::query_as::<_, EventFaq>("SELECT * FROM event_faqs WHERE event_id = ? ORDER BY id")
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        let media = sqlx::query_as::<_, EventMedia>("SELECT * FROM event_media WHERE event_id = ? ORDER BY id")
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        let occurrences = sqlx::query_as::<_, EventOccurrence>("SELECT * FROM event_occurrences WHERE event_id = ? ORDER BY id")
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(Some(EventAggregate { event, speakers, faqs, media, occurrences }))
    }

    async fn list(&self) -> Result<Vec<Event>, AppError> {
        sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, event: &Event, occurrences: Option<&[NewOccurrence]>) -> Result<Event, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let updated = sqlx::query_as::<_, Event>(
            r#"UPDATE events SET
                title=?, category=?, description=?, cover_image=?, vibe_video_url=?,
                event_type=?, location=?, registration_deadline=?, event_start=?, event_end=?,
                recurrence_type=?, is_paid_event=?, price=?, max_attendees=?,
                is_verified_by_admin=?, admin_verified_at=?, admin_comments=?,
                status=?, organizer_email=?, updated_at=?
               WHERE id=? RETURNING *"#
        )
            .bind(&event.title)
            .bind(&event.category)
            .bind(&event.description)
            .bind(&event.cover_image)
            .bind(&event.vibe_video_url)
            .bind(event.event_type)
            .bind(&event.location)
            .bind(event.registration_deadline)
            .bind(event.event_start)
            .bind(event.event_end)
            .bind(event.recurrence_type)
            .bind(event.is_paid_event)
            .bind(event.price)
            .bind(event.max_attendees)
            .bind(event.is_verified_by_admin)
            .bind(event.admin_verified_at)
            .bind(&event.admin_comments)
            .bind(event.status)
            .bind(&event.organizer_email)
            .bind(event.updated_at)
            .bind(event.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Event not found".into()))?;

        if let Some(occurrences) = occurrences {
            sqlx::query("DELETE FROM event_occurrences WHERE event_id = ?")
                .bind(updated.id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
            insert_occurrences(&mut *tx, &updated, occurrences).await?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Event not found".into()));
        }
        Ok(())
    }
}

// Occurrences snapshot the event title unless the caller supplied one.
async fn insert_occurrences(
    conn: &mut SqliteConnection,
    event: &Event,
    occurrences: &[NewOccurrence],
) -> Result<Vec<EventOccurrence>, AppError> {
    let mut stored = Vec::with_capacity(occurrences.len());
    for occ in occurrences {
        let title = occ.event_title.clone().unwrap_or_else(|| event.title.clone());
        stored.push(
            sqlx::query_as::<_, EventOccurrence>(
                "INSERT INTO event_occurrences (event_id, start_time, end_time, event_title) VALUES (?, ?, ?, ?) RETURNING *",
            )
                .bind(event.id)
                .bind(occ.start_time)
                .bind(occ.end_time)
                .bind(title)
                .fetch_one(&mut *conn)
                .await
                .map_err(AppError::Database)?,
        );
    }
    Ok(stored)
}
