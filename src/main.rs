use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use reqwest::Client;
use stackdump::{
    acquire::{ArchiveAcquirer, GcsSink, InternetArchive, LocalDirSink, ObjectSink},
    export::DualFormatExporter,
    table::{normalize::normalize_dir, TableNormalizer},
    PipelineConfig, TableKind,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Download a site dump, then turn its XML tables into CSV + JSON lines.
#[derive(Parser, Debug)]
#[command(name = "stackdump")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download, decompress and upload the archive.
    Acquire,
    /// Normalize the XML tables of an extracted dump.
    Normalize {
        /// Directory holding Posts.xml, Users.xml, ...; defaults to the extraction directory
        #[arg(long)]
        input_dir: Option<PathBuf>,
    },
    /// Acquire, then normalize.
    Run,
}

#[derive(Args, Debug)]
struct Overrides {
    /// YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    archive_file: Option<String>,

    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// GCS bucket for extracted files
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Local directory to mirror extracted files into instead of a bucket
    #[arg(long, global = true)]
    mirror_dir: Option<PathBuf>,

    /// Restrict to these tables (repeatable)
    #[arg(long = "table", value_enum, global = true)]
    tables: Vec<TableKind>,

    /// Also write <name>.parquet
    #[arg(long, global = true)]
    parquet: bool,
}

impl Overrides {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut cfg = match &self.config {
            Some(path) => PipelineConfig::from_yaml_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(v) = self.archive_file {
            cfg.archive_file = v;
        }
        if let Some(v) = self.work_dir {
            cfg.work_dir = v;
        }
        if let Some(v) = self.output_dir {
            cfg.output_dir = Some(v);
        }
        if let Some(v) = self.bucket {
            cfg.bucket = Some(v);
        }
        if let Some(v) = self.mirror_dir {
            cfg.mirror_dir = Some(v);
        }
        if !self.tables.is_empty() {
            cfg.tables = self.tables;
        }
        cfg.write_parquet |= self.parquet;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    let cli = Cli::parse();
    let cfg = cli.overrides.into_config()?;
    info!(?cfg, "configuration");

    match cli.command {
        Command::Acquire => acquire(&cfg).await,
        Command::Normalize { input_dir } => {
            let input = input_dir.unwrap_or_else(|| cfg.extract_dir());
            normalize(cfg, input).await
        }
        Command::Run => {
            acquire(&cfg).await?;
            let input = cfg.extract_dir();
            normalize(cfg, input).await
        }
    }
}

async fn acquire(cfg: &PipelineConfig) -> Result<()> {
    let source = InternetArchive::new(Client::new())?;

    // the storage client lives only for the acquisition stage
    let sink: Option<Box<dyn ObjectSink>> = match (&cfg.bucket, &cfg.mirror_dir) {
        (Some(bucket), _) => Some(Box::new(
            GcsSink::connect(bucket.clone(), cfg.bucket_prefix.clone()).await?,
        )),
        (None, Some(dir)) => Some(Box::new(LocalDirSink::new(
            dir.clone(),
            cfg.bucket_prefix.clone(),
        ))),
        (None, None) => None,
    };

    let mut acquirer = ArchiveAcquirer::new(&source, sink.as_deref(), cfg);
    let report = acquirer.run().await?;
    info!(
        archive = %report.archive.display(),
        dir = %report.extract_dir.display(),
        files = report.uploaded.len(),
        "acquired"
    );
    Ok(())
}

async fn normalize(cfg: PipelineConfig, input_dir: PathBuf) -> Result<()> {
    let out_dir = cfg.output_dir();
    info!(input = %input_dir.display(), output = %out_dir.display(), "normalizing");

    // offload the heavy parse to the blocking pool
    let results = tokio::task::spawn_blocking(move || {
        let normalizer = TableNormalizer::new(cfg.progress_every);
        let exporter = DualFormatExporter::new(out_dir).with_parquet(cfg.write_parquet);
        normalize_dir(&normalizer, &exporter, &input_dir, &cfg.tables, cfg.preview_rows)
    })
    .await?;

    let mut failed = 0;
    for (kind, res) in &results {
        match res {
            Ok(report) => info!(table = %kind, rows = report.rows, outputs = ?report.outputs, "done"),
            Err(e) => {
                failed += 1;
                error!(table = %kind, "failed: {:#}", e);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} tables failed", failed, results.len());
    }
    info!("all done");
    Ok(())
}
