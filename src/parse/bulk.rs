// src/parse/bulk.rs
use std::fs;
use std::path::Path;
use tracing::{debug, instrument};

use super::stream::RowStream;
use super::XmlTableParser;
use crate::error::{NormalizeError, Result};
use crate::table::RawTable;

/// Whole-document parser for tables known to fit in memory.
///
/// The file is read in one go and the full document is walked before any
/// row is returned, so a parse error anywhere means no table at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkParser;

impl BulkParser {
    /// Parse a document already held in memory.
    pub fn parse_bytes(&self, data: &[u8], path: &Path) -> Result<RawTable> {
        RowStream::new(data, path, 0).collect()
    }
}

impl XmlTableParser for BulkParser {
    #[instrument(level = "info", skip(self, path), fields(path = %path.display()))]
    fn parse(&self, path: &Path) -> Result<RawTable> {
        let data = fs::read(path).map_err(|e| NormalizeError::io(path, e))?;
        debug!(bytes = data.len(), "document loaded");
        self.parse_bytes(&data, path)
    }
}
