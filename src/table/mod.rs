// src/table/mod.rs
pub mod coerce;
pub mod kind;
pub mod normalize;
pub mod raw;
pub mod schema;

use arrow::{
    array::ArrayRef,
    record_batch::RecordBatch,
    util::pretty::pretty_format_batches,
};

pub use kind::TableKind;
pub use normalize::TableNormalizer;
pub use raw::{RawRow, RawTable};
pub use schema::{ColumnType, TableSchema};

use crate::error::Result;

/// A typed table: the raw columns coerced to their declared types, followed
/// by one label column per decoded category.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub kind: TableKind,
    pub batch: RecordBatch,
}

impl NormalizedTable {
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// First `n` rows in document order.
    pub fn head(&self, n: usize) -> RecordBatch {
        self.batch.slice(0, n.min(self.num_rows()))
    }

    /// Render the first `n` rows as a text table for logs.
    pub fn preview(&self, n: usize) -> Result<String> {
        Ok(pretty_format_batches(&[self.head(n)])?.to_string())
    }
}
