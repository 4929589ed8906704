// src/export/mod.rs
use arrow::{
    csv::WriterBuilder as CsvWriterBuilder,
    json::{writer::LineDelimited, WriterBuilder as JsonWriterBuilder},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{error, info, instrument, warn};

use crate::error::{NormalizeError, Result};
use crate::table::NormalizedTable;

/// ASCII record separator. Free-text bodies never contain it, so fields
/// need no quoting in practice.
pub const FIELD_SEPARATOR: u8 = 0x1e;

/// Layout used for timestamp cells in the delimited file.
pub const CSV_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Result of each sink; every sink is attempted regardless of the others.
#[derive(Debug)]
pub struct ExportOutcome {
    pub csv: Result<PathBuf>,
    pub json: Result<PathBuf>,
    pub parquet: Option<Result<PathBuf>>,
}

impl ExportOutcome {
    pub fn is_complete(&self) -> bool {
        self.csv.is_ok() && self.json.is_ok() && self.parquet.as_ref().map_or(true, |r| r.is_ok())
    }

    /// Written paths, or the first sink error.
    pub fn into_result(self) -> Result<Vec<PathBuf>> {
        let mut paths = vec![self.csv?, self.json?];
        if let Some(p) = self.parquet {
            paths.push(p?);
        }
        Ok(paths)
    }
}

/// Writes a normalized table as `<name>.csv` and `<name>.json` (plus
/// `<name>.parquet` when enabled) under one output directory.
#[derive(Debug, Clone)]
pub struct DualFormatExporter {
    out_dir: PathBuf,
    write_parquet: bool,
}

impl DualFormatExporter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            write_parquet: false,
        }
    }

    pub fn with_parquet(mut self, enabled: bool) -> Self {
        self.write_parquet = enabled;
        self
    }

    /// Export under the table kind's output name.
    pub fn export(&self, table: &NormalizedTable) -> ExportOutcome {
        self.export_as(table, table.kind.output_name())
    }

    #[instrument(level = "info", skip(self, table), fields(table = %table.kind, rows = table.num_rows()))]
    pub fn export_as(&self, table: &NormalizedTable, base_name: &str) -> ExportOutcome {
        if let Err(e) = fs::create_dir_all(&self.out_dir) {
            let msg = e.to_string();
            let fail = |ext: &str| {
                Err(NormalizeError::io(
                    self.out_dir.join(format!("{}.{}", base_name, ext)),
                    std::io::Error::new(e.kind(), msg.clone()),
                ))
            };
            return ExportOutcome {
                csv: fail("csv"),
                json: fail("json"),
                parquet: self.write_parquet.then(|| fail("parquet")),
            };
        }

        let csv = write_csv(&table.batch, &self.out_dir.join(format!("{}.csv", base_name)));
        let json = write_json(&table.batch, &self.out_dir.join(format!("{}.json", base_name)));
        let parquet = self.write_parquet.then(|| {
            write_parquet(&table.batch, &self.out_dir.join(format!("{}.parquet", base_name)))
        });

        let outcome = ExportOutcome { csv, json, parquet };
        for res in [Some(&outcome.csv), Some(&outcome.json), outcome.parquet.as_ref()]
            .into_iter()
            .flatten()
        {
            match res {
                Ok(path) => info!(path = %path.display(), "wrote"),
                Err(e) => error!(error = %e, "export failed"),
            }
        }
        if !outcome.is_complete() {
            warn!(out_dir = %self.out_dir.display(), "export incomplete");
        }
        outcome
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| NormalizeError::io(path, e))?;
    Ok(BufWriter::new(file))
}

/// Record-separator delimited text with a header row and no index column.
pub fn write_csv(batch: &RecordBatch, path: &Path) -> Result<PathBuf> {
    let mut writer = CsvWriterBuilder::new()
        .with_header(true)
        .with_delimiter(FIELD_SEPARATOR)
        .with_timestamp_format(CSV_TIMESTAMP_FORMAT.to_string())
        .build(create(path)?);
    writer.write(batch)?;
    writer
        .into_inner()
        .flush()
        .map_err(|e| NormalizeError::io(path, e))?;
    Ok(path.to_path_buf())
}

/// One JSON object per line; null cells are written as explicit nulls.
pub fn write_json(batch: &RecordBatch, path: &Path) -> Result<PathBuf> {
    let mut writer = JsonWriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, LineDelimited>(create(path)?);
    writer.write(batch)?;
    writer.finish()?;
    writer
        .into_inner()
        .flush()
        .map_err(|e| NormalizeError::io(path, e))?;
    Ok(path.to_path_buf())
}

pub fn write_parquet(batch: &RecordBatch, path: &Path) -> Result<PathBuf> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(create(path)?, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(path.to_path_buf())
}
