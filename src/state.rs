use crate::config::{AppConfig, StorageConfig};
use crate::storage::StorageClient;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = crate::db::connect(&config).await?;
        let storage = crate::storage::from_config(&config.storage).await?;

        Ok(Self::from_parts(db, config, storage))
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>, storage: Arc<dyn StorageClient>) -> Self {
        Self {
            db,
            config,
            storage,
        }
    }

    /// In-memory database plus a storage client that keeps nothing.
    pub async fn fake() -> anyhow::Result<Self> {
        use async_trait::async_trait;
        use bytes::Bytes;

        #[derive(Clone)]
        struct FakeStorage;
        #[async_trait]
        impl StorageClient for FakeStorage {
            async fn put_object(&self, k: &str, _b: Bytes, _ct: &str) -> anyhow::Result<String> {
                Ok(format!("fake://{}", k))
            }
            async fn delete_object(&self, _r: &str) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let db = crate::db::memory_pool().await?;
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: "sqlite::memory:".into(),
            max_connections: 1,
            storage: StorageConfig::Local {
                upload_dir: "fake".into(),
            },
        });

        Ok(Self::from_parts(db, config, Arc::new(FakeStorage)))
    }
}
