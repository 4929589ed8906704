// src/table/normalize.rs
use anyhow::Context;
use arrow::{
    array::{Array, ArrayRef, Int64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};
use tracing::{error, info, instrument, warn};

use super::coerce::coerce_table;
use super::kind::TableKind;
use super::raw::RawTable;
use super::schema::TableSchema;
use super::NormalizedTable;
use crate::error::{NormalizeError, Result};
use crate::export::DualFormatExporter;
use crate::parse::DEFAULT_PROGRESS_EVERY;

/// Append one label column per category of `schema`, after every existing column.
pub fn decode_columns(batch: RecordBatch, schema: &TableSchema) -> Result<RecordBatch> {
    if schema.categories.is_empty() {
        return Ok(batch);
    }
    let mut fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();

    for cat in schema.categories {
        let labels = match batch
            .column_by_name(cat.code_column())
            .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        {
            Some(codes) => cat.decode_array(codes),
            None => {
                // coercion always materialises code columns; keep the row count anyway
                warn!(column = cat.code_column(), "code column missing; labels left null");
                arrow::array::StringArray::new_null(batch.num_rows())
            }
        };
        fields.push(Field::new(cat.label_column(), DataType::Utf8, true));
        columns.push(Arc::new(labels) as ArrayRef);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        columns,
        &options,
    )?)
}

/// Parse → coerce → decode for one logical table. Holds no state between tables.
#[derive(Debug, Clone, Copy)]
pub struct TableNormalizer {
    pub progress_every: u64,
}

impl Default for TableNormalizer {
    fn default() -> Self {
        Self {
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

impl TableNormalizer {
    pub fn new(progress_every: u64) -> Self {
        Self { progress_every }
    }

    /// Coerce and decode an already parsed table.
    pub fn normalize_raw(&self, kind: TableKind, raw: &RawTable) -> Result<NormalizedTable> {
        let schema = kind.schema();
        let typed = coerce_table(raw, &schema)?;
        let batch = decode_columns(typed, &schema)?;
        debug_assert_eq!(batch.num_rows(), raw.num_rows());
        Ok(NormalizedTable { kind, batch })
    }

    /// Normalize `kind` from the matching file in `input_dir`.
    #[instrument(level = "info", skip(self, input_dir), fields(table = %kind))]
    pub fn normalize(&self, kind: TableKind, input_dir: &Path) -> Result<NormalizedTable> {
        let path = input_dir.join(kind.file_name());
        if !path.is_file() {
            return Err(NormalizeError::MissingInput { kind, path });
        }
        let start = Instant::now();
        let raw = kind.strategy().parser(self.progress_every).parse(&path)?;
        info!(
            rows = raw.num_rows(),
            columns = raw.columns.len(),
            elapsed = ?start.elapsed(),
            "parsed"
        );
        self.normalize_raw(kind, &raw)
    }
}

/// What happened to one table in a directory run.
#[derive(Debug)]
pub struct TableReport {
    pub kind: TableKind,
    pub rows: usize,
    pub outputs: Vec<PathBuf>,
}

/// Normalize and export each of `kinds` from `input_dir`. A failing table is
/// logged and reported; the remaining tables still run.
pub fn normalize_dir(
    normalizer: &TableNormalizer,
    exporter: &DualFormatExporter,
    input_dir: &Path,
    kinds: &[TableKind],
    preview_rows: usize,
) -> Vec<(TableKind, anyhow::Result<TableReport>)> {
    kinds
        .iter()
        .map(|&kind| {
            let res = normalize_one(normalizer, exporter, input_dir, kind, preview_rows);
            if let Err(e) = &res {
                let msg = format!("{:#}", e);
                error!(table = %kind, error = %msg, "table failed");
            }
            (kind, res)
        })
        .collect()
}

fn normalize_one(
    normalizer: &TableNormalizer,
    exporter: &DualFormatExporter,
    input_dir: &Path,
    kind: TableKind,
    preview_rows: usize,
) -> anyhow::Result<TableReport> {
    let table = normalizer
        .normalize(kind, input_dir)
        .with_context(|| format!("normalizing {}", kind))?;

    info!(table = %kind, columns = ?table.column_names(), "normalized");
    if preview_rows > 0 {
        match table.preview(preview_rows) {
            Ok(text) => info!(table = %kind, "head({}):\n{}", preview_rows, text),
            Err(e) => warn!(table = %kind, error = %e, "preview failed"),
        }
    }

    let outputs = exporter
        .export(&table)
        .into_result()
        .with_context(|| format!("exporting {}", kind))?;

    Ok(TableReport {
        kind,
        rows: table.num_rows(),
        outputs,
    })
}
