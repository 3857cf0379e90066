pub mod auth;
pub mod event;
pub mod user;
pub mod upload;
