use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;

use crate::config::{S3Config, StorageConfig};

/// Blob store for meal images. `put_object` returns the reference that is
/// persisted in `images.path`; `delete_object` takes that same reference.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str)
        -> anyhow::Result<String>;
    async fn delete_object(&self, reference: &str) -> anyhow::Result<()>;
}

pub async fn from_config(config: &StorageConfig) -> anyhow::Result<std::sync::Arc<dyn StorageClient>> {
    Ok(match config {
        StorageConfig::Local { upload_dir } => std::sync::Arc::new(LocalStorage::new(upload_dir)),
        StorageConfig::S3(s3) => std::sync::Arc::new(S3Storage::new(s3).await?),
    })
}

/// Files under a local directory, served back by relative path.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> anyhow::Result<String> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(path.to_string_lossy().into_owned())
    }

    async fn delete_object(&self, reference: &str) -> anyhow::Result<()> {
        match tokio::fs::remove_file(reference).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", reference)),
        }
    }
}

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn new(cfg: &S3Config) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for S3Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(key.to_string())
    }

    async fn delete_object(&self, reference: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(reference)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }
}

#[cfg(test)]
mod storage_tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("meal-tracker-{}-{}", tag, uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn local_put_then_delete() {
        let root = scratch_dir("put");
        let storage = LocalStorage::new(&root);

        let reference = storage
            .put_object("meals/1/a.jpg", Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap();
        assert!(reference.ends_with("a.jpg"));
        assert_eq!(tokio::fs::read(&reference).await.unwrap(), b"jpeg");

        storage.delete_object(&reference).await.unwrap();
        assert!(tokio::fs::metadata(&reference).await.is_err());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn local_delete_of_missing_file_is_ok() {
        let storage = LocalStorage::new(scratch_dir("missing"));
        storage
            .delete_object("/definitely/not/here.png")
            .await
            .unwrap();
    }
}
