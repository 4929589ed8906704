// src/config.rs
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::parse::DEFAULT_PROGRESS_EVERY;
use crate::table::TableKind;

/// Everything a run needs, passed explicitly to each stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Archive item holding the site dumps.
    pub identifier: String,
    /// Compressed dump file inside the item.
    pub archive_file: String,
    /// Download + extraction root.
    pub work_dir: PathBuf,
    /// Where normalized tables go; defaults to the extraction directory.
    pub output_dir: Option<PathBuf>,
    /// Object-storage bucket for extracted files.
    pub bucket: Option<String>,
    pub bucket_prefix: Option<String>,
    /// Local directory standing in for the bucket (no credentials needed).
    pub mirror_dir: Option<PathBuf>,
    /// Concurrent uploads.
    pub upload_concurrency: usize,
    pub progress_every: u64,
    pub write_parquet: bool,
    pub preview_rows: usize,
    pub tables: Vec<TableKind>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            identifier: "stackexchange".into(),
            archive_file: "gaming.stackexchange.com.7z".into(),
            work_dir: PathBuf::from("stackexchange"),
            output_dir: None,
            bucket: None,
            bucket_prefix: None,
            mirror_dir: None,
            upload_concurrency: 4,
            progress_every: DEFAULT_PROGRESS_EVERY,
            write_parquet: false,
            preview_rows: 5,
            tables: TableKind::ALL.to_vec(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `archive_file` must be a plain `<stem>.<ext>` file name. Without a stem
    /// and an extension the extraction directory lands on the archive itself.
    pub fn validate(&self) -> Result<()> {
        let name = self.archive_file.as_str();
        if name.contains(['/', '\\']) {
            bail!("archive_file {:?} must be a file name, not a path", name);
        }
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Ok(()),
            _ => bail!(
                "archive_file {:?} needs a name and an extension, e.g. site.7z",
                name
            ),
        }
    }

    /// `<work_dir>/<archive_file without its last extension>`. Only
    /// distinct from the downloaded archive for a config that passes
    /// [`PipelineConfig::validate`].
    pub fn extract_dir(&self) -> PathBuf {
        let stem = match self.archive_file.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => self.archive_file.as_str(),
        };
        self.work_dir.join(stem)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| self.extract_dir())
    }
}
