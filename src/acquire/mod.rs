// src/acquire/mod.rs
//! Download → decompress → upload for one dump archive.

pub mod extract;
pub mod sink;
pub mod source;

use anyhow::{anyhow, bail, Context, Result};
use futures::{stream, StreamExt};
use std::{
    fmt,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{error, info, instrument, warn};

pub use extract::{dir_size_bytes, extract_archive, extracted_files};
pub use sink::{GcsSink, LocalDirSink, ObjectSink};
pub use source::{ArchiveFile, ArchiveSource, InternetArchive};

use crate::config::PipelineConfig;

const MIB: f64 = 1024.0 * 1024.0;

/// Stages of an acquisition run. Transitions are strictly in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AcquireState {
    NotDownloaded,
    Downloading,
    Downloaded,
    Decompressing,
    Decompressed,
    Uploading,
    Done,
}

impl AcquireState {
    pub fn as_str(&self) -> &str {
        match self {
            AcquireState::NotDownloaded => "NotDownloaded",
            AcquireState::Downloading => "Downloading",
            AcquireState::Downloaded => "Downloaded",
            AcquireState::Decompressing => "Decompressing",
            AcquireState::Decompressed => "Decompressed",
            AcquireState::Uploading => "Uploading",
            AcquireState::Done => "Done",
        }
    }

    pub fn next(&self) -> Option<AcquireState> {
        match self {
            AcquireState::NotDownloaded => Some(AcquireState::Downloading),
            AcquireState::Downloading => Some(AcquireState::Downloaded),
            AcquireState::Downloaded => Some(AcquireState::Decompressing),
            AcquireState::Decompressing => Some(AcquireState::Decompressed),
            AcquireState::Decompressed => Some(AcquireState::Uploading),
            AcquireState::Uploading => Some(AcquireState::Done),
            AcquireState::Done => None,
        }
    }
}

impl fmt::Display for AcquireState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct AcquireReport {
    pub archive: PathBuf,
    pub extract_dir: PathBuf,
    pub extracted_bytes: u64,
    pub uploaded: Vec<String>,
}

/// Drives one archive through [`AcquireState`]. A failure leaves the acquirer
/// in the state where it happened; callers start over with a fresh acquirer.
pub struct ArchiveAcquirer<'a> {
    source: &'a dyn ArchiveSource,
    sink: Option<&'a dyn ObjectSink>,
    config: &'a PipelineConfig,
    state: AcquireState,
}

impl<'a> ArchiveAcquirer<'a> {
    pub fn new(
        source: &'a dyn ArchiveSource,
        sink: Option<&'a dyn ObjectSink>,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            source,
            sink,
            config,
            state: AcquireState::NotDownloaded,
        }
    }

    pub fn state(&self) -> AcquireState {
        self.state
    }

    fn advance(&mut self) -> Result<()> {
        let next = self
            .state
            .next()
            .ok_or_else(|| anyhow!("acquisition already {}", self.state))?;
        info!(from = %self.state, to = %next, "acquire state");
        self.state = next;
        Ok(())
    }

    #[instrument(level = "info", skip(self), fields(item = %self.config.identifier, file = %self.config.archive_file))]
    pub async fn run(&mut self) -> Result<AcquireReport> {
        if self.state != AcquireState::NotDownloaded {
            bail!("acquirer is in state {}; start a new run", self.state);
        }
        self.config.validate()?;
        let start = Instant::now();

        self.advance()?; // Downloading
        let archive = self.download().await?;
        self.advance()?; // Downloaded

        self.advance()?; // Decompressing
        let extract_dir = self.config.extract_dir();
        let extracted_bytes = decompress(archive.clone(), extract_dir.clone()).await?;
        self.advance()?; // Decompressed

        self.advance()?; // Uploading
        let uploaded = self.upload(&extract_dir).await?;
        self.advance()?; // Done

        info!(elapsed = ?start.elapsed(), uploaded = uploaded.len(), "acquisition complete");
        Ok(AcquireReport {
            archive,
            extract_dir,
            extracted_bytes,
            uploaded,
        })
    }

    async fn download(&self) -> Result<PathBuf> {
        let cfg = self.config;
        match self.source.list_files(&cfg.identifier).await {
            Ok(files) => match files.iter().find(|f| f.name == cfg.archive_file) {
                Some(f) => match f.size {
                    Some(bytes) => info!("archive listed: {:.2} MB", bytes as f64 / MIB),
                    None => info!("archive listed without size"),
                },
                None => warn!("archive not in item listing; trying download anyway"),
            },
            Err(e) => warn!(error = %e, "item listing unavailable"),
        }

        let path = self
            .source
            .download(&cfg.identifier, &cfg.archive_file, &cfg.work_dir)
            .await
            .with_context(|| format!("downloading {}/{}", cfg.identifier, cfg.archive_file))?;
        info!(path = %path.display(), "downloaded");
        Ok(path)
    }

    /// Every file is attempted; the run fails afterwards if any put failed.
    async fn upload(&self, dir: &Path) -> Result<Vec<String>> {
        let Some(sink) = self.sink else {
            info!("no object sink configured; skipping upload");
            return Ok(Vec::new());
        };
        let files = extracted_files(dir)?;
        info!(files = files.len(), dest = %sink.describe(), "uploading");

        let results: Vec<(String, Result<()>)> = stream::iter(files)
            .map(|path| async move {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let res = sink.put(&name, &path).await;
                (name, res)
            })
            .buffer_unordered(self.config.upload_concurrency.max(1))
            .collect()
            .await;

        let mut uploaded = Vec::new();
        let mut failed = Vec::new();
        for (name, res) in results {
            match res {
                Ok(()) => uploaded.push(name),
                Err(e) => {
                    let msg = format!("{:#}", e);
                    error!(file = %name, error = %msg, "upload failed");
                    failed.push(name);
                }
            }
        }
        uploaded.sort();
        if !failed.is_empty() {
            failed.sort();
            bail!(
                "{} of {} uploads failed: {}",
                failed.len(),
                failed.len() + uploaded.len(),
                failed.join(", ")
            );
        }
        Ok(uploaded)
    }
}

/// Extraction runs on the blocking pool; returns the extracted size in bytes.
async fn decompress(archive: PathBuf, dest: PathBuf) -> Result<u64> {
    tokio::task::spawn_blocking(move || -> Result<u64> {
        extract_archive(&archive, &dest)?;
        let bytes = dir_size_bytes(&dest)?;
        info!(
            dir = %dest.display(),
            "decompressed size {:.2} GB",
            bytes as f64 / extract::GIB
        );
        Ok(bytes)
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serves a fixed zip from memory instead of the network.
    struct FakeSource {
        files: Vec<(&'static str, &'static str)>,
        fail: bool,
    }

    #[async_trait]
    impl ArchiveSource for FakeSource {
        async fn list_files(&self, _identifier: &str) -> Result<Vec<ArchiveFile>> {
            Ok(vec![ArchiveFile {
                name: "site.zip".into(),
                size: Some(1024),
            }])
        }

        async fn download(&self, _id: &str, filename: &str, dest_dir: &Path) -> Result<PathBuf> {
            if self.fail {
                bail!("connection reset");
            }
            fs::create_dir_all(dest_dir)?;
            let path = dest_dir.join(filename);
            extract::tests::write_zip(&path, &self.files)?;
            Ok(path)
        }
    }

    /// Local sink that refuses one file name.
    struct FlakySink {
        inner: LocalDirSink,
        reject: &'static str,
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectSink for FlakySink {
        async fn put(&self, name: &str, local: &Path) -> Result<()> {
            self.attempts.lock().unwrap().push(name.to_string());
            if name == self.reject {
                bail!("quota exceeded");
            }
            self.inner.put(name, local).await
        }

        fn describe(&self) -> String {
            "flaky".into()
        }
    }

    fn config(work: &TempDir) -> PipelineConfig {
        PipelineConfig {
            archive_file: "site.zip".into(),
            work_dir: work.path().to_path_buf(),
            ..PipelineConfig::default()
        }
    }

    fn source() -> FakeSource {
        FakeSource {
            files: vec![("Posts.xml", "<posts/>"), ("Tags.xml", "<tags/>")],
            fail: false,
        }
    }

    #[test]
    fn states_advance_in_order() {
        let mut s = AcquireState::NotDownloaded;
        let mut seen = vec![s];
        while let Some(n) = s.next() {
            seen.push(n);
            s = n;
        }
        assert_eq!(seen.len(), 7);
        assert_eq!(seen.last(), Some(&AcquireState::Done));
    }

    #[tokio::test]
    async fn rerun_clears_stale_extraction_and_uploads_all() -> Result<()> {
        let work = TempDir::new()?;
        let mirror = TempDir::new()?;
        let cfg = config(&work);

        let stale = cfg.extract_dir();
        fs::create_dir_all(&stale)?;
        fs::write(stale.join("Stale.xml"), "<stale/>")?;

        let src = source();
        let sink = LocalDirSink::new(mirror.path(), None);
        let mut acq = ArchiveAcquirer::new(&src, Some(&sink), &cfg);
        let report = acq.run().await?;

        assert_eq!(acq.state(), AcquireState::Done);
        assert!(!stale.join("Stale.xml").exists());
        assert!(stale.join("Posts.xml").exists());
        assert_eq!(report.uploaded, vec!["Posts.xml", "Tags.xml"]);
        assert_eq!(report.extracted_bytes, 15);
        assert!(mirror.path().join("Tags.xml").exists());
        assert!(!mirror.path().join("Stale.xml").exists());

        // a second run starts over cleanly
        let mut again = ArchiveAcquirer::new(&src, Some(&sink), &cfg);
        again.run().await?;
        assert!(acq.run().await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn download_failure_stops_in_downloading() -> Result<()> {
        let work = TempDir::new()?;
        let cfg = config(&work);
        let src = FakeSource {
            fail: true,
            ..source()
        };
        let mut acq = ArchiveAcquirer::new(&src, None, &cfg);
        assert!(acq.run().await.is_err());
        assert_eq!(acq.state(), AcquireState::Downloading);
        assert!(!cfg.extract_dir().exists());
        Ok(())
    }

    #[tokio::test]
    async fn one_failed_upload_does_not_block_others() -> Result<()> {
        let work = TempDir::new()?;
        let mirror = TempDir::new()?;
        let cfg = config(&work);
        let src = source();
        let sink = FlakySink {
            inner: LocalDirSink::new(mirror.path(), None),
            reject: "Posts.xml",
            attempts: Mutex::new(Vec::new()),
        };

        let mut acq = ArchiveAcquirer::new(&src, Some(&sink), &cfg);
        let err = acq.run().await.unwrap_err();
        assert!(format!("{:#}", err).contains("Posts.xml"));
        assert_eq!(acq.state(), AcquireState::Uploading);
        assert_eq!(sink.attempts.lock().unwrap().len(), 2);
        assert!(mirror.path().join("Tags.xml").exists());
        Ok(())
    }

    #[tokio::test]
    async fn extensionless_archive_name_fails_before_download() -> Result<()> {
        let work = TempDir::new()?;
        let cfg = PipelineConfig {
            archive_file: "site".into(),
            ..config(&work)
        };
        let src = source();
        let mut acq = ArchiveAcquirer::new(&src, None, &cfg);
        assert!(acq.run().await.is_err());
        assert_eq!(acq.state(), AcquireState::NotDownloaded);
        assert!(!work.path().join("site").exists());
        Ok(())
    }

    #[tokio::test]
    async fn no_sink_skips_upload() -> Result<()> {
        let work = TempDir::new()?;
        let cfg = config(&work);
        let src = source();
        let mut acq = ArchiveAcquirer::new(&src, None, &cfg);
        let report = acq.run().await?;
        assert!(report.uploaded.is_empty());
        assert_eq!(acq.state(), AcquireState::Done);
        Ok(())
    }
}
