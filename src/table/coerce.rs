// src/table/coerce.rs
use arrow::{
    array::{ArrayRef, Int64Builder, StringBuilder, TimestampMillisecondBuilder},
    datatypes::Schema,
    record_batch::{RecordBatch, RecordBatchOptions},
};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{debug, warn};

use super::raw::RawTable;
use super::schema::{ColumnType, TableSchema};
use crate::error::Result;

/// Value substituted for a missing or unparseable code. No enumeration
/// defines it, so it decodes to the "unknown" (null) label.
pub const CODE_SENTINEL: i64 = 0;

/// Date-time layout used throughout the dump, e.g. `2020-01-01T00:00:00.123`.
/// `%.f` makes the fractional part optional.
const DUMP_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse `"YYYY-MM-DDTHH:MM:SS[.fff]"` → millis since epoch (no zone).
pub fn parse_timestamp_millis(s: &str) -> Option<i64> {
    let s = s.trim();
    // minimal length + separators check
    let b = s.as_bytes();
    if b.len() < 19 || b[4] != b'-' || b[7] != b'-' || b[10] != b'T' {
        return None;
    }
    NaiveDateTime::parse_from_str(s, DUMP_DATETIME_FORMAT)
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}

pub fn parse_int(s: &str) -> Option<i64> {
    s.trim().parse().ok()
}

/// Output column order: attributes in first-seen order, then any code column
/// the schema declares but no row carried.
pub fn output_columns(raw: &RawTable, schema: &TableSchema) -> Vec<String> {
    let mut cols = raw.columns.clone();
    for cat in schema.categories {
        if !raw.has_column(cat.code_column()) {
            cols.push(cat.code_column().to_string());
        }
    }
    cols
}

/// Apply the declared schema column-by-column. A cell that fails to parse
/// becomes null; code columns then have their nulls replaced by
/// [`CODE_SENTINEL`].
pub fn coerce_table(raw: &RawTable, schema: &TableSchema) -> Result<RecordBatch> {
    let columns = output_columns(raw, schema);
    let mut fields = Vec::with_capacity(columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());

    for name in &columns {
        let ty = schema.column_type(name);
        let (array, failures) = match ty {
            ColumnType::Int => coerce_int(raw, name, schema.is_code_column(name)),
            ColumnType::Timestamp => coerce_timestamp(raw, name),
            ColumnType::Str => (coerce_str(raw, name), 0),
        };
        if failures > 0 {
            warn!(column = %name, failures, "cells degraded to null during coercion");
        }
        fields.push(ty.field(name));
        arrays.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(raw.num_rows()));
    let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
    Ok(batch)
}

fn coerce_int(raw: &RawTable, name: &str, is_code: bool) -> (ArrayRef, usize) {
    let mut b = Int64Builder::with_capacity(raw.num_rows());
    let mut failures = 0;
    for (idx, row) in raw.rows.iter().enumerate() {
        let v = match row.get(name) {
            Some(s) if !s.trim().is_empty() => {
                let parsed = parse_int(s);
                if parsed.is_none() {
                    failures += 1;
                    debug!(row = idx, column = name, value = s, "not an integer");
                }
                parsed
            }
            _ => None,
        };
        let v = if is_code {
            Some(v.unwrap_or(CODE_SENTINEL))
        } else {
            v
        };
        b.append_option(v);
    }
    (Arc::new(b.finish()) as ArrayRef, failures)
}

fn coerce_timestamp(raw: &RawTable, name: &str) -> (ArrayRef, usize) {
    let mut b = TimestampMillisecondBuilder::with_capacity(raw.num_rows());
    let mut failures = 0;
    for (idx, row) in raw.rows.iter().enumerate() {
        let ts = match row.get(name) {
            Some(s) if !s.trim().is_empty() => {
                let parsed = parse_timestamp_millis(s);
                if parsed.is_none() {
                    failures += 1;
                    debug!(row = idx, column = name, value = s, "not a timestamp");
                }
                parsed
            }
            _ => None,
        };
        b.append_option(ts);
    }
    (Arc::new(b.finish()) as ArrayRef, failures)
}

fn coerce_str(raw: &RawTable, name: &str) -> ArrayRef {
    let mut b = StringBuilder::new();
    for row in &raw.rows {
        b.append_option(row.get(name));
    }
    Arc::new(b.finish()) as ArrayRef
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::raw::RawRow;
    use crate::table::schema::{COMMENTS, POSTS, TAGS};
    use arrow::array::{Array, Int64Array, StringArray, TimestampMillisecondArray};

    fn table(rows: Vec<Vec<(&str, &str)>>) -> RawTable {
        rows.into_iter().map(RawRow::from_iter).collect()
    }

    #[test]
    fn parses_dump_timestamps() {
        assert_eq!(parse_timestamp_millis("1970-01-01T00:00:01"), Some(1_000));
        assert_eq!(parse_timestamp_millis("1970-01-01T00:00:01.250"), Some(1_250));
        assert_eq!(parse_timestamp_millis("2020/01/01 00:00:00"), None);
        assert_eq!(parse_timestamp_millis("2020-13-01T00:00:00"), None);
        assert_eq!(parse_timestamp_millis("yesterday"), None);
    }

    #[test]
    fn bad_cells_become_null_without_dropping_rows() -> anyhow::Result<()> {
        let raw = table(vec![
            vec![("Id", "1"), ("Count", "12"), ("TagName", "rust")],
            vec![("Id", "two"), ("Count", ""), ("TagName", "")],
            vec![("Id", "3")],
        ]);
        let batch = coerce_table(&raw, &TAGS)?;
        assert_eq!(batch.num_rows(), 3);

        let ids = batch
            .column_by_name("Id")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(ids.value(0), 1);
        assert!(ids.is_null(1));
        assert_eq!(ids.value(2), 3);

        let names = batch
            .column_by_name("TagName")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(names.value(0), "rust");
        assert!(names.is_valid(1));
        assert_eq!(names.value(1), "");
        assert!(names.is_null(2));
        Ok(())
    }

    #[test]
    fn missing_code_column_is_materialised_with_sentinel() -> anyhow::Result<()> {
        let raw = table(vec![
            vec![("Id", "1"), ("PostTypeId", "2")],
            vec![("Id", "2"), ("PostTypeId", "x")],
            vec![("Id", "3")],
        ]);
        let batch = coerce_table(&raw, &POSTS)?;
        let codes = batch
            .column_by_name("PostTypeId")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(codes.null_count(), 0);
        assert_eq!(codes.values().to_vec(), vec![2, 0, 0]);

        let absent = table(vec![vec![("Id", "9")]]);
        let batch = coerce_table(&absent, &POSTS)?;
        let names: Vec<_> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["Id", "PostTypeId"]);
        Ok(())
    }

    #[test]
    fn timestamps_and_undeclared_columns() -> anyhow::Result<()> {
        let raw = table(vec![
            vec![("CreationDate", "2020-01-01T00:00:00.000"), ("Extra", "7")],
            vec![("CreationDate", "not a date")],
        ]);
        let batch = coerce_table(&raw, &COMMENTS)?;
        let ts = batch
            .column_by_name("CreationDate")
            .unwrap()
            .as_any()
            .downcast_ref::<TimestampMillisecondArray>()
            .unwrap();
        assert_eq!(ts.value(0), 1_577_836_800_000);
        assert!(ts.is_null(1));
        // undeclared attributes pass through untouched
        let extra = batch
            .column_by_name("Extra")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(extra.value(0), "7");
        Ok(())
    }

    #[test]
    fn empty_table_keeps_zero_rows() -> anyhow::Result<()> {
        let batch = coerce_table(&RawTable::new(), &TAGS)?;
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 0);
        Ok(())
    }
}
