use anyhow::Result;
use clap::Parser;
use reqwest::Client;
use stackdump::acquire::{ArchiveSource, InternetArchive};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Print every file of an archive item with its size in MB.
#[derive(Parser, Debug)]
struct Args {
    /// Archive item identifier
    #[arg(long, default_value = "stackexchange")]
    identifier: String,

    /// Only list files whose name contains this string
    #[arg(long)]
    filter: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let source = InternetArchive::new(Client::new())?;
    let files = source.list_files(&args.identifier).await?;

    let mut total: u64 = 0;
    for f in &files {
        let Some(size) = f.size else { continue };
        total += size;
        if args
            .filter
            .as_deref()
            .map_or(true, |needle| f.name.contains(needle))
        {
            println!("{}, {:.2} MB", f.name, size as f64 / 1024.0 / 1024.0);
        }
    }
    info!(files = files.len(), "listed");
    println!(
        "FULL ARCHIVE SIZE of {}: {:.2} GB",
        args.identifier,
        total as f64 / 1024.0 / 1024.0 / 1024.0
    );
    Ok(())
}
