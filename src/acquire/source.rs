// src/acquire/source.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, instrument};
use url::Url;

/// One file of an archive item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub name: String,
    /// Bytes; the host omits it for some derived files.
    pub size: Option<u64>,
}

/// Read-only view of the archive host: list an item's files and fetch one.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    async fn list_files(&self, identifier: &str) -> Result<Vec<ArchiveFile>>;

    /// Download `filename` of `identifier` into `dest_dir`, returning the local path.
    async fn download(&self, identifier: &str, filename: &str, dest_dir: &Path) -> Result<PathBuf>;
}

const DEFAULT_BASE_URL: &str = "https://archive.org/";

/// archive.org metadata + download endpoints.
#[derive(Debug, Clone)]
pub struct InternetArchive {
    client: Client,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    files: Vec<MetadataFile>,
}

#[derive(Debug, Deserialize)]
struct MetadataFile {
    name: String,
    // sizes come back as decimal strings
    size: Option<String>,
}

impl InternetArchive {
    pub fn new(client: Client) -> Result<Self> {
        Ok(Self::with_base_url(client, Url::parse(DEFAULT_BASE_URL)?))
    }

    pub fn with_base_url(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    fn metadata_url(&self, identifier: &str) -> Result<Url> {
        Ok(self.base.join(&format!("metadata/{}", identifier))?)
    }

    fn download_url(&self, identifier: &str, filename: &str) -> Result<Url> {
        Ok(self
            .base
            .join(&format!("download/{}/{}", identifier, filename))?)
    }
}

fn parse_metadata(body: &str) -> Result<Vec<ArchiveFile>> {
    let meta: MetadataResponse = serde_json::from_str(body).context("decoding item metadata")?;
    Ok(meta
        .files
        .into_iter()
        .map(|f| ArchiveFile {
            size: f.size.and_then(|s| s.trim().parse().ok()),
            name: f.name,
        })
        .collect())
}

#[async_trait]
impl ArchiveSource for InternetArchive {
    #[instrument(level = "info", skip(self))]
    async fn list_files(&self, identifier: &str) -> Result<Vec<ArchiveFile>> {
        let url = self.metadata_url(identifier)?;
        let body = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {}", url))?
            .error_for_status()?
            .text()
            .await
            .with_context(|| format!("reading body from {}", url))?;
        parse_metadata(&body)
    }

    #[instrument(level = "info", skip(self, dest_dir))]
    async fn download(&self, identifier: &str, filename: &str, dest_dir: &Path) -> Result<PathBuf> {
        let url = self.download_url(identifier, filename)?;
        let dest_path = dest_dir.join(filename);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {}", url))?
            .error_for_status()?;

        // archives run to gigabytes; stream to disk instead of buffering
        let mut file = fs::File::create(&dest_path)
            .await
            .with_context(|| format!("creating {}", dest_path.display()))?;
        let mut stream = resp.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("reading {}", url))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        debug!(bytes = written, path = %dest_path.display(), "download complete");

        Ok(dest_path)
    }
}
