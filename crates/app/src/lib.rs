//! Taskogotchi application composition root
//!
//! Wires stores and the notification sender into the domain services.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use taskogotchi_common::Config;
use taskogotchi_fights::{FightService, FightsRepositories, InMemoryStore, RegistrationService};
use taskogotchi_notify::{NotificationSender, NotifierConfig, NotifierFactory};

/// Domain services sharing one set of stores
#[derive(Clone)]
pub struct Services {
    pub registration: RegistrationService,
    pub fights: FightService,
}

impl Services {
    /// Services over PostgreSQL repositories
    pub fn postgres(pool: PgPool, notifier: Arc<dyn NotificationSender>) -> Self {
        let repos = Arc::new(FightsRepositories::new(pool));
        Self {
            registration: RegistrationService::new(repos.clone()),
            fights: FightService::new(repos.clone(), repos, notifier),
        }
    }

    /// Services over an in-process store
    pub fn in_memory(store: InMemoryStore, notifier: Arc<dyn NotificationSender>) -> Self {
        let store = Arc::new(store);
        Self {
            registration: RegistrationService::new(store.clone()),
            fights: FightService::new(store.clone(), store, notifier),
        }
    }
}

/// Connect to the configured database
pub async fn connect(config: &Config) -> Result<PgPool, anyhow::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Database connection failed: {}", e))?;
    Ok(pool)
}

/// Build the notification sender from environment configuration
pub fn create_notifier() -> Result<Arc<dyn NotificationSender>, anyhow::Error> {
    let config = NotifierConfig::from_env()?;
    let sender = NotifierFactory::create(config)?;
    Ok(Arc::from(sender))
}

/// Create the production services from configuration
pub async fn create_services(config: &Config) -> Result<Services, anyhow::Error> {
    let pool = connect(config).await?;
    let notifier = create_notifier()?;
    tracing::info!("Services created");
    Ok(Services::postgres(pool, notifier))
}
