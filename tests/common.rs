use eventsphere_backend::{
    api::router::create_router,
    state::AppState,
    config::{Config, SubArrayPolicy},
    infra::{
        factory::assemble_state,
        repositories::{sqlite_event_repo::SqliteEventRepo, sqlite_user_repo::SqliteUserRepo},
    },
    domain::ports::EmailService,
    error::AppError,
};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use axum::{
    body::Body,
    http::{Request, header},
    response::Response,
    Router,
};
use async_trait::async_trait;
use tempfile::TempDir;
use tower::ServiceExt;
use serde_json::{json, Value};

pub const STRONG_PASSWORD: &str = "Str0ng!Pass";

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct CapturingEmailService {
    pub sent: Mutex<Vec<SentEmail>>,
}

#[async_trait]
impl EmailService for CapturingEmailService {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentEmail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: html_body.to_string(),
        });
        Ok(())
    }
}

impl CapturingEmailService {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Token from the `token=` query parameter of the most recent mail to `recipient`.
    pub fn last_token_for(&self, recipient: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let mail = sent.iter().rev().find(|m| m.recipient == recipient)?;
        let start = mail.body.find("token=")? + "token=".len();
        Some(mail.body[start..].chars().take_while(|c| c.is_ascii_alphanumeric()).collect())
    }
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

const BOUNDARY: &str = "eventsphere-test-boundary";

pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                ).as_bytes());
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    BOUNDARY, name, file_name
                ).as_bytes());
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn parse_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub uploads: TempDir,
    pub emails: Arc<CapturingEmailService>,
    pub state: Arc<AppState>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        Self::with_policy(SubArrayPolicy::Strict).await
    }

    pub async fn with_policy(policy: SubArrayPolicy) -> Self {
        Self::build(policy, 10 * 1024 * 1024).await
    }

    pub async fn with_upload_limit(max_upload_bytes: usize) -> Self {
        Self::build(SubArrayPolicy::Strict, max_upload_bytes).await
    }

    async fn build(policy: SubArrayPolicy, max_upload_bytes: usize) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let uploads = tempfile::tempdir().expect("Failed to create uploads dir");

        let config = Config {
            database_url: Some(db_url),
            port: 0,
            jwt_secret_key: "integration-test-secret-key".to_string(),
            jwt_expiry_minutes: 60,
            auth_issuer: "eventsphere-test".to_string(),
            frontend_base_url: "http://localhost:3000".to_string(),
            uploads_dir: uploads.path().to_string_lossy().to_string(),
            max_upload_bytes,
            sub_array_policy: policy,
            mail_service_url: "http://localhost".to_string(),
            mail_service_token: "token".to_string(),
        };

        let emails = Arc::new(CapturingEmailService::default());
        let state = Arc::new(assemble_state(
            &config,
            Arc::new(SqliteEventRepo::new(pool.clone())),
            Arc::new(SqliteUserRepo::new(pool.clone())),
            emails.clone(),
        ));

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            uploads,
            emails,
            state,
        }
    }

    pub async fn send_json(&self, method: &str, uri: &str, token: Option<&str>, payload: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match payload {
            Some(payload) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(payload.to_string())
            }
            None => Body::empty(),
        };
        self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    pub async fn send_form(&self, uri: &str, token: Option<&str>, parts: &[Part<'_>]) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::from(multipart_body(parts))).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.send_json("POST", "/api/users/login", None, Some(json!({
            "email": email,
            "password": password
        }))).await
    }

    /// Registers, verifies and logs in a user. Returns `(user_id, bearer_token)`.
    pub async fn verified_user(&self, name: &str, email: &str) -> (i64, String) {
        let res = self.send_json("POST", "/api/users/register", None, Some(json!({
            "name": name,
            "email": email,
            "password": STRONG_PASSWORD
        }))).await;
        assert!(res.status().is_success(), "register failed: {}", res.status());

        let token = self.emails.last_token_for(email).expect("no verification email captured");
        let res = self.send_json("GET", &format!("/api/users/verify-email?token={}", token), None, None).await;
        assert!(res.status().is_success(), "verify failed: {}", res.status());

        let res = self.login(email, STRONG_PASSWORD).await;
        assert!(res.status().is_success(), "login failed: {}", res.status());
        let body = parse_body(res).await;
        (
            body["data"]["user"]["userId"].as_i64().unwrap(),
            body["data"]["token"].as_str().unwrap().to_string(),
        )
    }

    /// Grants the Admin role and returns a token that carries it.
    pub async fn promote_to_admin(&self, user_id: i64, email: &str) -> String {
        sqlx::query("UPDATE users SET role = 'Admin' WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .unwrap();
        let body = parse_body(self.login(email, STRONG_PASSWORD).await).await;
        body["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn count_rows(&self, table: &str, event_id: i64) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {} WHERE event_id = ?", table))
            .bind(event_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}
