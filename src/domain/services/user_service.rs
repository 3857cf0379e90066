use std::sync::Arc;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::types::Json;
use tera::{Context, Tera};
use tracing::{error, info, warn};

use crate::domain::{
    models::user::{NewUser, User, UserProfile, UserRole},
    ports::{EmailService, UserRepository},
    services::{
        auth_service::{generate_token, hash_token, AuthService},
        password::{hash_password, validate_password_strength, verify_password},
    },
};
use crate::error::AppError;

const VERIFICATION_TTL_HOURS: i64 = 24;
const RESET_TTL_HOURS: i64 = 1;

pub const VERIFY_EMAIL_TEMPLATE: &str = "verify_email.html";
pub const PASSWORD_RESET_TEMPLATE: &str = "password_reset.html";

#[derive(Debug)]
pub enum RegisterOutcome {
    Created(UserProfile),
    /// The address belongs to an unverified account; a fresh link was sent.
    VerificationResent,
}

#[derive(Debug)]
pub struct LoginResult {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Copy)]
pub enum SettingsDocument {
    Preferences,
    NotificationSettings,
}

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    email: Arc<dyn EmailService>,
    auth: Arc<AuthService>,
    templates: Arc<Tera>,
    frontend_base_url: String,
}

impl UserService {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        email: Arc<dyn EmailService>,
        auth: Arc<AuthService>,
        templates: Arc<Tera>,
        frontend_base_url: String,
    ) -> Self {
        Self {
            repo,
            email,
            auth,
            templates,
            frontend_base_url: frontend_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<RegisterOutcome, AppError> {
        let name = name.trim();
        let email = email.trim();
        if name.chars().count() < 3 {
            return Err(AppError::Validation("Invalid name. Must be at least 3 characters.".into()));
        }
        if !email.contains('@') {
            return Err(AppError::Validation("Invalid email address.".into()));
        }

        if let Some(mut existing) = self.repo.find_by_email(email).await? {
            if existing.is_email_verified {
                return Err(AppError::Conflict("Email already registered. Please login.".into()));
            }
            let token = generate_token();
            existing.email_verification_token_hash = Some(hash_token(&token));
            existing.email_verification_token_expiry = Some(Utc::now() + Duration::hours(VERIFICATION_TTL_HOURS));
            existing.updated_at = Utc::now().max(existing.updated_at);
            let existing = self.repo.update(&existing).await?;

            info!(user_id = existing.id, "Verification email resent for unverified account");
            self.send_verification(&existing, &token).await;
            return Ok(RegisterOutcome::VerificationResent);
        }

        validate_password_strength(password)?;

        let token = generate_token();
        let user = self.repo.create(&NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            role: UserRole::User,
            email_verification_token_hash: Some(hash_token(&token)),
            email_verification_token_expiry: Some(Utc::now() + Duration::hours(VERIFICATION_TTL_HOURS)),
        }).await?;

        info!(user_id = user.id, "User registered");
        self.send_verification(&user, &token).await;
        Ok(RegisterOutcome::Created(UserProfile::from(&user)))
    }

    pub async fn verify_email(&self, token: &str) -> Result<(), AppError> {
        let invalid = || AppError::Validation("Invalid or expired verification token".into());

        let mut user = self.repo.find_by_verification_token(&hash_token(token)).await?
            .ok_or_else(invalid)?;
        if user.is_email_verified {
            return Err(invalid());
        }
        if user.email_verification_token_expiry.map_or(true, |exp| exp < Utc::now()) {
            return Err(invalid());
        }

        user.is_email_verified = true;
        user.email_verification_token_hash = None;
        user.email_verification_token_expiry = None;
        user.updated_at = Utc::now().max(user.updated_at);
        self.repo.update(&user).await?;

        info!(user_id = user.id, "Email verified");
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AppError> {
        let user = self.repo.find_by_email(email.trim()).await?
            .filter(|u| verify_password(password, &u.password_hash))
            .ok_or_else(|| AppError::Unauthorized("Email or password is incorrect.".into()))?;

        if !user.is_email_verified {
            return Err(AppError::Forbidden(
                "Email not verified. Please check your inbox for the verification link.".into(),
            ));
        }

        let token = self.auth.issue_token(&user)?;
        info!(user_id = user.id, "User logged in");
        Ok(LoginResult { token, user: UserProfile::from(&user) })
    }

    /// Unknown or unverified addresses are silently ignored.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let Some(mut user) = self.repo.find_by_email(email.trim()).await? else {
            return Ok(());
        };
        if !user.is_email_verified {
            return Ok(());
        }

        let token = generate_token();
        user.password_reset_token_hash = Some(hash_token(&token));
        user.password_reset_token_expiry = Some(Utc::now() + Duration::hours(RESET_TTL_HOURS));
        user.updated_at = Utc::now().max(user.updated_at);
        let user = self.repo.update(&user).await?;

        let link = format!("{}/password_reset?token={}", self.frontend_base_url, token);
        self.send_templated(&user, PASSWORD_RESET_TEMPLATE, "Reset your password", &link).await;
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let invalid = || AppError::Validation("Invalid or expired reset token".into());

        let mut user = self.repo.find_by_reset_token(&hash_token(token)).await?
            .ok_or_else(invalid)?;
        if user.password_reset_token_expiry.map_or(true, |exp| exp < Utc::now()) {
            return Err(invalid());
        }
        validate_password_strength(new_password)?;

        user.password_hash = hash_password(new_password)?;
        user.password_reset_token_hash = None;
        user.password_reset_token_expiry = None;
        user.updated_at = Utc::now().max(user.updated_at);
        self.repo.update(&user).await?;

        info!(user_id = user.id, "Password reset");
        Ok(())
    }

    pub async fn profile(&self, user_id: i64) -> Result<UserProfile, AppError> {
        let user = self.find(user_id).await?;
        Ok(UserProfile::from(&user))
    }

    pub async fn settings(&self, user_id: i64, doc: SettingsDocument) -> Result<Value, AppError> {
        let user = self.find(user_id).await?;
        Ok(match doc {
            SettingsDocument::Preferences => user.preferences.0,
            SettingsDocument::NotificationSettings => user.notification_settings.0,
        })
    }

    pub async fn replace_settings(&self, user_id: i64, doc: SettingsDocument, value: Value) -> Result<Value, AppError> {
        if !value.is_object() {
            return Err(AppError::Validation("Settings must be a JSON object".into()));
        }

        let mut user = self.find(user_id).await?;
        match doc {
            SettingsDocument::Preferences => user.preferences = Json(value),
            SettingsDocument::NotificationSettings => user.notification_settings = Json(value),
        }
        user.updated_at = Utc::now().max(user.updated_at);
        let user = self.repo.update(&user).await?;

        Ok(match doc {
            SettingsDocument::Preferences => user.preferences.0,
            SettingsDocument::NotificationSettings => user.notification_settings.0,
        })
    }

    async fn find(&self, user_id: i64) -> Result<User, AppError> {
        self.repo.find_by_id(user_id).await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn send_verification(&self, user: &User, token: &str) {
        let link = format!("{}/verify_email?token={}", self.frontend_base_url, token);
        self.send_templated(user, VERIFY_EMAIL_TEMPLATE, "Verify your email address", &link).await;
    }

    // Delivery problems are logged; the account change has already been stored.
    async fn send_templated(&self, user: &User, template: &str, subject: &str, link: &str) {
        let context = match Context::from_value(json!({ "name": user.name, "link": link })) {
            Ok(ctx) => ctx,
            Err(e) => {
                error!("Failed to build email context: {}", e);
                return;
            }
        };
        let body = match self.templates.render(template, &context) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to render {}: {:?}", template, e);
                return;
            }
        };
        if let Err(e) = self.email.send(&user.email, subject, &body).await {
            warn!(user_id = user.id, "Email '{}' was not delivered: {}", subject, e);
        }
    }
}
