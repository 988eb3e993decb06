use crate::auth::{
    jwt::TokenService,
    password::PasswordHasher,
    repo::PgUserStore,
    store::{InMemoryUserStore, UserStore},
};
use crate::config::AppConfig;
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Option<PgPool>,
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub hasher: PasswordHasher,
    pub tokens: TokenService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (db, users) = match &config.database_url {
            Some(url) => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                let users = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
                (Some(db), users)
            }
            None => {
                tracing::warn!("DATABASE_URL not set; users are kept in memory");
                (None, Arc::new(InMemoryUserStore::new()) as Arc<dyn UserStore>)
            }
        };

        Self::from_parts(db, config, users)
    }

    pub fn from_parts(
        db: Option<PgPool>,
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
    ) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::new(&config.password)?;
        let tokens = TokenService::new(&config.jwt);
        Ok(Self {
            db,
            config,
            users,
            hasher,
            tokens,
        })
    }

    /// In-memory state with a fixed secret and cheap hashing, for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with_users(Arc::new(InMemoryUserStore::new()))
    }

    #[cfg(test)]
    pub fn fake_with_users(users: Arc<dyn UserStore>) -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                ttl_minutes: 60,
            },
            password: crate::config::PasswordConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
        });

        Self::from_parts(None, config, users).expect("fake state")
    }
}
