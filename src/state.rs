use std::sync::Arc;
use crate::domain::services::{
    auth_service::AuthService, event_service::EventService, user_service::UserService,
};
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub auth_service: Arc<AuthService>,
    pub event_service: Arc<EventService>,
    pub user_service: Arc<UserService>,
}
