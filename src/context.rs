/// Application context and dependency injection
use crate::{
    auth::{CredentialResolver, JwtCredentialResolver},
    config::ServerConfig,
    db,
    error::{ApiError, ApiResult},
    events::EventStore,
    mailer::Mailer,
    moderation::{AuditLog, ModerationService},
    notify::EmailNotifier,
    places::PlacesClient,
    users::UserStore,
    volunteers::VolunteerRegistry,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub events: EventStore,
    pub users: UserStore,
    pub volunteers: VolunteerRegistry,
    pub moderation: Arc<ModerationService>,
    pub mailer: Mailer,
    pub credential_resolver: Arc<dyn CredentialResolver>,
    pub places: Option<Arc<PlacesClient>>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let events = EventStore::new(db.clone());

        // Surface stored-data corruption before serving requests
        events.verify_integrity().await?;

        let users = UserStore::new(db.clone());
        let volunteers = VolunteerRegistry::new(db.clone());
        let mailer = Mailer::new(config.email.clone())?;

        let notifier = Arc::new(EmailNotifier::new(users.clone(), mailer.clone()));
        let audit = AuditLog::new(db.clone());
        let moderation = Arc::new(ModerationService::new(
            db.clone(),
            events.clone(),
            audit,
            notifier,
        ));

        let credential_resolver = Arc::new(JwtCredentialResolver::new(
            config.authentication.jwt_secret.clone(),
            users.clone(),
        ));

        let places = config.places.as_ref().map(|places_config| {
            Arc::new(PlacesClient::new(
                places_config.api_key.clone(),
                Duration::from_secs(places_config.cache_ttl),
            ))
        });

        if places.is_some() {
            tracing::info!("Nearby place lookups enabled");
        }

        Ok(Self {
            config: Arc::new(config),
            db,
            events,
            users,
            volunteers,
            moderation,
            mailer,
            credential_resolver,
            places,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ApiResult<()> {
        let dir = &config.storage.data_directory;
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                ApiError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        if let Some(parent) = config.storage.database.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
