use crate::auth::tokens::TokenKeys;
use crate::config::AppConfig;
use crate::db::PgStore;
use crate::mail::{self, Mailer};
use crate::memory::MemoryStore;
use crate::posts::repo::PostRepo;
use crate::storage::{LocalStorage, StorageClient};
use crate::users::repo::UserRepo;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepo>,
    pub posts: Arc<dyn PostRepo>,
    pub config: Arc<AppConfig>,
    pub tokens: TokenKeys,
    pub storage: Arc<dyn StorageClient>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (users, posts): (Arc<dyn UserRepo>, Arc<dyn PostRepo>) =
            if config.database_url.starts_with("memory://") {
                tracing::warn!("using in-memory store; data is lost on exit");
                let store = Arc::new(MemoryStore::new());
                (store.clone() as Arc<dyn UserRepo>, store as Arc<dyn PostRepo>)
            } else {
                let store = Arc::new(PgStore::connect(&config.database_url).await?);
                store.migrate().await?;
                (store.clone() as Arc<dyn UserRepo>, store as Arc<dyn PostRepo>)
            };

        let storage = Arc::new(LocalStorage::new(config.avatar_dir()).await?) as Arc<dyn StorageClient>;
        let mailer = mail::from_config(&config.mail)?;

        Ok(Self::from_parts(users, posts, config, storage, mailer))
    }

    pub fn from_parts(
        users: Arc<dyn UserRepo>,
        posts: Arc<dyn PostRepo>,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let tokens = TokenKeys::new(&config.tokens);
        Self {
            users,
            posts,
            config,
            tokens,
            storage,
            mailer,
        }
    }
}
