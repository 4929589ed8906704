// src/parse/mod.rs
//! XML dump → [`RawTable`].
//!
//! A dump file is a single root element whose children are row elements
//! carrying all their data in attributes:
//!
//! ```text
//! <comments>
//!   <row Id="1" PostId="10" Text="nice" ... />
//! </comments>
//! ```
//!
//! Two parsers share one row walker ([`RowStream`]) and produce identical
//! tables. [`BulkParser`] loads the whole document into memory and validates
//! it before any row is handed out; [`StreamingParser`] reads the file one
//! event at a time so peak memory stays at a single row plus the rows already
//! collected.

pub mod bulk;
pub mod stream;

use std::path::Path;

pub use bulk::BulkParser;
pub use stream::{RowStream, StreamingParser};

use crate::error::Result;
use crate::table::RawTable;

/// Rows between progress log lines in the streaming parser.
pub const DEFAULT_PROGRESS_EVERY: u64 = 1_000;

/// Which parser a table kind goes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParseStrategy {
    Bulk,
    Streaming,
}

/// Produce a [`RawTable`] from a dump file.
pub trait XmlTableParser {
    fn parse(&self, path: &Path) -> Result<RawTable>;
}

impl ParseStrategy {
    pub fn parser(&self, progress_every: u64) -> Box<dyn XmlTableParser> {
        match self {
            ParseStrategy::Bulk => Box::new(BulkParser),
            ParseStrategy::Streaming => Box::new(StreamingParser::new(progress_every)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NormalizeError;
    use tempfile::TempDir;

    #[test]
    fn bulk_and_streaming_agree_row_for_row() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = fixtures::write(&dir, "Comments.xml", fixtures::COMMENTS);

        let bulk = ParseStrategy::Bulk.parser(DEFAULT_PROGRESS_EVERY).parse(&path)?;
        let streamed = ParseStrategy::Streaming.parser(1).parse(&path)?;

        assert_eq!(bulk.num_rows(), 3);
        assert_eq!(bulk.columns, streamed.columns);
        assert_eq!(bulk.rows, streamed.rows);
        assert_eq!(
            bulk.columns,
            vec![
                "Id",
                "PostId",
                "Score",
                "Text",
                "CreationDate",
                "UserId",
                "ContentLicense",
                "UserDisplayName"
            ]
        );
        Ok(())
    }

    #[test]
    fn both_parsers_reject_truncated_documents() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let truncated = &fixtures::COMMENTS[..fixtures::COMMENTS.len() - 13];
        let path = fixtures::write(&dir, "Comments.xml", truncated);

        for strategy in [ParseStrategy::Bulk, ParseStrategy::Streaming] {
            let err = strategy.parser(DEFAULT_PROGRESS_EVERY).parse(&path).unwrap_err();
            assert!(
                matches!(err, NormalizeError::MalformedDocument { .. }),
                "{:?}: {}",
                strategy,
                err
            );
        }
        Ok(())
    }

    #[test]
    fn both_parsers_reject_mismatched_tags() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = fixtures::write(
            &dir,
            "Votes.xml",
            r#"<votes><row Id="1" VoteTypeId="2" /><row Id="2"></rwo></votes>"#,
        );
        for strategy in [ParseStrategy::Bulk, ParseStrategy::Streaming] {
            let err = strategy.parser(DEFAULT_PROGRESS_EVERY).parse(&path).unwrap_err();
            assert!(matches!(err, NormalizeError::MalformedDocument { .. }));
        }
        Ok(())
    }

    #[test]
    fn empty_root_yields_empty_table() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = fixtures::write(&dir, "Tags.xml", "<?xml version=\"1.0\"?>\n<tags/>\n");
        for strategy in [ParseStrategy::Bulk, ParseStrategy::Streaming] {
            let table = strategy.parser(DEFAULT_PROGRESS_EVERY).parse(&path)?;
            assert_eq!(table.num_rows(), 0);
            assert!(table.columns.is_empty());
        }
        Ok(())
    }
}
