// src/acquire/extract.rs
use anyhow::{anyhow, bail, Context, Result};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{info, instrument};
use zip::ZipArchive;

/// Bytes per GiB, for size reports.
pub const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Remove any previous extraction at `dest`, then unpack `archive` into it.
/// `.7z` and `.zip` are supported.
#[instrument(level = "info", skip(archive, dest), fields(archive = %archive.display(), dest = %dest.display()))]
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    if dest.exists() {
        info!("removing stale extraction directory");
        fs::remove_dir_all(dest)
            .with_context(|| format!("removing stale directory {}", dest.display()))?;
    }
    fs::create_dir_all(dest).with_context(|| format!("creating {}", dest.display()))?;

    let ext = archive
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "7z" => sevenz_rust::decompress_file(archive, dest)
            .map_err(|e| anyhow!("decompressing {}: {:?}", archive.display(), e))?,
        "zip" => {
            let file = File::open(archive)
                .with_context(|| format!("Failed to open ZIP file: {:?}", archive))?;
            let mut zip = ZipArchive::new(file)
                .with_context(|| format!("Failed to read ZIP archive: {:?}", archive))?;
            zip.extract(dest)
                .with_context(|| format!("extracting {:?}", archive))?;
        }
        other => bail!("unsupported archive format {:?} for {}", other, archive.display()),
    }
    Ok(())
}

/// Regular files directly under `dir`, sorted by name.
pub fn extracted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut files = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Total size of the regular files directly under `dir`.
pub fn dir_size_bytes(dir: &Path) -> Result<u64> {
    let mut size = 0;
    for path in extracted_files(dir)? {
        size += fs::metadata(&path)
            .with_context(|| format!("stat {}", path.display()))?
            .len();
    }
    Ok(size)
}
