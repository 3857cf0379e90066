use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;
use tera::Tera;

use crate::config::Config;
use crate::state::AppState;
use crate::domain::ports::{EmailService, EventRepository, UserRepository};
use crate::domain::services::{
    auth_service::AuthService,
    event_service::EventService,
    user_service::{UserService, PASSWORD_RESET_TEMPLATE, VERIFY_EMAIL_TEMPLATE},
};
use crate::infra::email::http_email_service::HttpEmailService;
use crate::infra::storage::local_file_store::LocalFileStore;
use crate::infra::repositories::{
    postgres_event_repo::PostgresEventRepo, postgres_user_repo::PostgresUserRepo,
    sqlite_event_repo::SqliteEventRepo, sqlite_user_repo::SqliteUserRepo,
};

pub async fn bootstrap_state(config: &Config) -> AppState {
    let email_service = Arc::new(HttpEmailService::new(
        config.mail_service_url.clone(),
        config.mail_service_token.clone(),
    ));
    bootstrap_state_with_email(config, email_service).await
}

/// Connects to the configured store and wires every service around it.
/// Without a `DATABASE_URL` the data lives in an in-memory SQLite database.
pub async fn bootstrap_state_with_email(config: &Config, email_service: Arc<dyn EmailService>) -> AppState {
    let (event_repo, user_repo): (Arc<dyn EventRepository>, Arc<dyn UserRepository>) = match config.database_url.as_deref() {
        Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {
            let pool = connect_postgres(url).await;
            (Arc::new(PostgresEventRepo::new(pool.clone())), Arc::new(PostgresUserRepo::new(pool)))
        }
        Some(url) => {
            let pool = connect_sqlite_file(url).await;
            (Arc::new(SqliteEventRepo::new(pool.clone())), Arc::new(SqliteUserRepo::new(pool)))
        }
        None => {
            let pool = connect_sqlite_memory().await;
            (Arc::new(SqliteEventRepo::new(pool.clone())), Arc::new(SqliteUserRepo::new(pool)))
        }
    };

    assemble_state(config, event_repo, user_repo, email_service)
}

pub fn assemble_state(
    config: &Config,
    event_repo: Arc<dyn EventRepository>,
    user_repo: Arc<dyn UserRepository>,
    email_service: Arc<dyn EmailService>,
) -> AppState {
    let file_store = Arc::new(LocalFileStore::new(&config.uploads_dir));
    let auth_service = Arc::new(AuthService::new(config));
    let event_service = Arc::new(EventService::new(event_repo, file_store));
    let user_service = Arc::new(UserService::new(
        user_repo,
        email_service,
        auth_service.clone(),
        load_templates(),
        config.frontend_base_url.clone(),
    ));

    AppState {
        config: config.clone(),
        auth_service,
        event_service,
        user_service,
    }
}

fn load_templates() -> Arc<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_template(VERIFY_EMAIL_TEMPLATE, include_str!("../templates/verify_email.html"))
        .expect("Failed to load verification email template");
    tera.add_raw_template(PASSWORD_RESET_TEMPLATE, include_str!("../templates/password_reset.html"))
        .expect("Failed to load password reset template");
    Arc::new(tera)
}

async fn connect_postgres(url: &str) -> PgPool {
    info!("Initializing PostgreSQL connection...");

    let mut opts: PgConnectOptions = url.parse().expect("Invalid Postgres URL");
    opts = opts.log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_with(opts)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!("./migrations/postgres")
        .run(&pool)
        .await
        .expect("Failed to run Postgres migrations");
    pool
}

async fn connect_sqlite_file(url: &str) -> SqlitePool {
    info!("Initializing SQLite connection with WAL Mode...");

    let opts = SqliteConnectOptions::from_str(url)
        .expect("Invalid SQLite connection string")
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await
        .expect("Failed to connect to SQLite");

    run_sqlite_migrations(&pool).await;
    pool
}

// Every connection to `sqlite::memory:` is a separate database, so the pool
// holds exactly one connection and never recycles it.
async fn connect_sqlite_memory() -> SqlitePool {
    info!("DATABASE_URL not set, using in-memory SQLite");

    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("Invalid SQLite connection string")
        .foreign_keys(true)
        .log_statements(LevelFilter::Debug);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await
        .expect("Failed to open in-memory SQLite");

    run_sqlite_migrations(&pool).await;
    pool
}

async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
