pub mod auth_service;
pub mod event_service;
pub mod password;
pub mod user_service;
