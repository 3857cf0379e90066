use std::env;
use std::str::FromStr;

pub const MIN_JWT_SECRET_LEN: usize = 16;

/// How malformed JSON inside the `Speakers`/`Faqs`/`Media`/`Occurrences`
/// form fields is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubArrayPolicy {
    /// Reject the request with a 400 naming the offending field.
    #[default]
    Strict,
    /// Log and continue with an empty collection.
    Lenient,
}

impl FromStr for SubArrayPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(SubArrayPolicy::Strict),
            "lenient" => Ok(SubArrayPolicy::Lenient),
            other => Err(format!("unknown sub-array parse policy '{}'", other)),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    /// `None` selects the in-memory SQLite store.
    pub database_url: Option<String>,
    pub port: u16,
    pub jwt_secret_key: String,
    pub jwt_expiry_minutes: i64,
    pub auth_issuer: String,
    pub frontend_base_url: String,
    pub uploads_dir: String,
    pub max_upload_bytes: usize,
    pub sub_array_policy: SubArrayPolicy,
    pub mail_service_url: String,
    pub mail_service_token: String,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_secret_key = env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        if let Err(msg) = check_jwt_secret(&jwt_secret_key) {
            panic!("{}", msg);
        }

        Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            port: env::var("PORT").unwrap_or_else(|_| "5274".to_string()).parse().expect("PORT must be a number"),
            jwt_secret_key,
            jwt_expiry_minutes: env::var("JWT_EXPIRY_MINUTES").unwrap_or_else(|_| "60".to_string()).parse().expect("JWT_EXPIRY_MINUTES must be a number"),
            auth_issuer: env::var("AUTH_ISSUER").unwrap_or_else(|_| "eventsphere-api".to_string()),
            frontend_base_url: env::var("FRONTEND_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            uploads_dir: env::var("UPLOADS_DIR").unwrap_or_else(|_| "wwwroot/uploads".to_string()),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES").unwrap_or_else(|_| "104857600".to_string()).parse().expect("MAX_UPLOAD_BYTES must be a number"),
            sub_array_policy: env::var("SUBARRAY_PARSE_POLICY")
                .map(|v| v.parse().expect("SUBARRAY_PARSE_POLICY must be 'strict' or 'lenient'"))
                .unwrap_or_default(),
            mail_service_url: env::var("MAIL_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/send".to_string()),
            mail_service_token: env::var("MAIL_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
        }
    }
}

/// The signing key is symmetric (HS256), so a short key is rejected at startup.
pub fn check_jwt_secret(secret: &str) -> Result<(), String> {
    if secret.chars().count() < MIN_JWT_SECRET_LEN {
        return Err(format!(
            "JWT_SECRET_KEY is missing or too short. Set a strong key (min {} chars).",
            MIN_JWT_SECRET_LEN
        ));
    }
    Ok(())
}
