// src/acquire/sink.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use google_cloud_storage::{
    client::{Client, ClientConfig},
    http::objects::upload::{Media, UploadObjectRequest, UploadType},
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Write-only object store keyed by filename.
#[async_trait]
pub trait ObjectSink: Send + Sync {
    async fn put(&self, name: &str, local: &Path) -> Result<()>;

    /// Human-readable destination for logs.
    fn describe(&self) -> String;
}

fn object_name(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) if !p.trim_end_matches('/').is_empty() => {
            format!("{}/{}", p.trim_end_matches('/'), name)
        }
        _ => name.to_string(),
    }
}

/// Open `local` as an upload body along with its length. The file is
/// streamed by the client, never read into memory up front.
async fn open_body(local: &Path) -> Result<(fs::File, u64)> {
    let file = fs::File::open(local)
        .await
        .with_context(|| format!("opening {}", local.display()))?;
    let len = file
        .metadata()
        .await
        .with_context(|| format!("stat {}", local.display()))?
        .len();
    Ok((file, len))
}

/// Google Cloud Storage bucket, authenticated via application default credentials.
pub struct GcsSink {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl GcsSink {
    pub async fn connect(bucket: impl Into<String>, prefix: Option<String>) -> Result<Self> {
        let cfg = ClientConfig::default()
            .with_auth()
            .await
            .context("authenticating to GCS")?;
        Ok(Self {
            client: Client::new(cfg),
            bucket: bucket.into(),
            prefix,
        })
    }
}

#[async_trait]
impl ObjectSink for GcsSink {
    async fn put(&self, name: &str, local: &Path) -> Result<()> {
        let object = object_name(self.prefix.as_deref(), name);
        let (file, len) = open_body(local).await?;

        let mut media = Media::new(object.clone());
        media.content_length = Some(len);
        let request = UploadObjectRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };

        self.client
            .upload_object(&request, file, &UploadType::Simple(media))
            .await
            .with_context(|| format!("Failed to upload {} to GCS bucket {}", object, self.bucket))?;

        info!(object = %object, bytes = len, "Uploaded to GCS");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.prefix.as_deref().unwrap_or(""))
    }
}

/// Copies objects into a local directory, mirroring the bucket layout.
#[derive(Debug, Clone)]
pub struct LocalDirSink {
    root: PathBuf,
    prefix: Option<String>,
}

impl LocalDirSink {
    pub fn new(root: impl Into<PathBuf>, prefix: Option<String>) -> Self {
        Self {
            root: root.into(),
            prefix,
        }
    }
}

#[async_trait]
impl ObjectSink for LocalDirSink {
    async fn put(&self, name: &str, local: &Path) -> Result<()> {
        let dest = self.root.join(object_name(self.prefix.as_deref(), name));
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        let bytes = fs::copy(local, &dest)
            .await
            .with_context(|| format!("copying {} to {}", local.display(), dest.display()))?;
        info!(dest = %dest.display(), bytes, "stored");
        Ok(())
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}
