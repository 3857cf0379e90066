pub mod auth;
pub mod event_form;
pub mod rejection;
