#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

/// Where uploaded meal images end up.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local { upload_dir: String },
    S3(S3Config),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match std::env::var("APP_PORT") {
            Ok(v) => v
                .parse::<u16>()
                .map_err(|e| anyhow::anyhow!("invalid APP_PORT {v:?}: {e}"))?,
            Err(_) => 8080,
        };
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://meal_tracker.db".into());
        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);

        let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".into());
        let storage = match backend.as_str() {
            "local" => StorageConfig::Local {
                upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "assets/images".into()),
            },
            "s3" => StorageConfig::S3(S3Config {
                endpoint: std::env::var("S3_ENDPOINT")?,
                bucket: std::env::var("S3_BUCKET")?,
                access_key: std::env::var("S3_ACCESS_KEY")?,
                secret_key: std::env::var("S3_SECRET_KEY")?,
                region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            }),
            other => anyhow::bail!("unknown STORAGE_BACKEND {other:?}, expected local or s3"),
        };

        Ok(Self {
            host,
            port,
            database_url,
            max_connections,
            storage,
        })
    }

    /// `host:port` the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
