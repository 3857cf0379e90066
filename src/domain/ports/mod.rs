use crate::domain::models::{
    event::{Event, EventAggregate, NewEvent, NewOccurrence},
    upload::UploadFolder,
    user::{NewUser, User},
};
use crate::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Inserts the event and all of its children in a single transaction.
    async fn create_aggregate(&self, organizer_id: i64, draft: &NewEvent) -> Result<EventAggregate, AppError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Event>, AppError>;
    async fn find_aggregate(&self, id: i64) -> Result<Option<EventAggregate>, AppError>;
    async fn list(&self) -> Result<Vec<Event>, AppError>;
    /// Writes scalar fields; replaces the occurrence set when `occurrences` is given.
    async fn update(&self, event: &Event, occurrences: Option<&[NewOccurrence]>) -> Result<Event, AppError>;
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &NewUser) -> Result<User, AppError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_verification_token(&self, token_hash: &str) -> Result<Option<User>, AppError>;
    async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, AppError>;
    async fn update(&self, user: &User) -> Result<User, AppError>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Writes `bytes` under `folder` with a fresh random name and returns
    /// the public relative URL (`/uploads/{folder}/{name}`).
    async fn store(&self, bytes: &[u8], original_filename: &str, folder: UploadFolder) -> Result<String, AppError>;
    /// Deletes a file previously returned by `store`. Missing files are ignored.
    async fn remove(&self, url: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError>;
}
