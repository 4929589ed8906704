// src/parse/stream.rs
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use super::{XmlTableParser, DEFAULT_PROGRESS_EVERY};
use crate::error::{NormalizeError, Result};
use crate::table::{RawRow, RawTable};

/// Lazy sequence of row elements read from an XML reader.
///
/// Only the event buffer for the current element is held; it is cleared
/// before the next event is read. After the first error the stream is
/// finished and cannot be resumed.
pub struct RowStream<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    path: PathBuf,
    depth: usize,
    seen_root: bool,
    done: bool,
    rows_read: u64,
    progress_every: u64,
}

impl<R: BufRead> RowStream<R> {
    /// `path` is only used to label errors and log lines.
    pub fn new(inner: R, path: impl Into<PathBuf>, progress_every: u64) -> Self {
        let mut reader = Reader::from_reader(inner);
        let config = reader.config_mut();
        config.trim_text(true);
        config.check_end_names = true;
        Self {
            reader,
            buf: Vec::with_capacity(8192),
            path: path.into(),
            depth: 0,
            seen_root: false,
            done: false,
            rows_read: 0,
            progress_every,
        }
    }

    /// Rows produced so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    fn malformed(&mut self, err: impl std::fmt::Display) -> Option<Result<RawRow>> {
        self.done = true;
        Some(Err(NormalizeError::malformed(&self.path, err)))
    }

    fn milestone(&self) {
        if self.progress_every > 0 && self.rows_read % self.progress_every == 0 {
            info!(path = %self.path.display(), rows = self.rows_read, "parsed rows");
        }
    }
}

/// Copy a row element's attributes into an owned [`RawRow`].
pub(crate) fn row_from_element(e: &BytesStart<'_>) -> std::result::Result<RawRow, quick_xml::Error> {
    let mut row = RawRow::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        row.insert(key, value);
    }
    Ok(row)
}

impl<R: BufRead> Iterator for RowStream<R> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(ev) => ev,
                Err(e) => {
                    let pos = self.reader.buffer_position();
                    return self.malformed(format!("{} at byte {}", e, pos));
                }
            };

            let row = match event {
                Event::Start(ref e) => {
                    self.depth += 1;
                    match self.depth {
                        1 if self.seen_root => Some(Err("multiple root elements".to_string())),
                        1 => {
                            self.seen_root = true;
                            None
                        }
                        2 => Some(row_from_element(e).map_err(|err| err.to_string())),
                        // nested content of a row element is not part of the table
                        _ => None,
                    }
                }
                Event::Empty(ref e) => match self.depth {
                    0 if self.seen_root => Some(Err("multiple root elements".to_string())),
                    0 => {
                        self.seen_root = true;
                        None
                    }
                    1 => Some(row_from_element(e).map_err(|err| err.to_string())),
                    _ => None,
                },
                Event::End(_) => {
                    self.depth = self.depth.saturating_sub(1);
                    None
                }
                Event::Eof => {
                    self.done = true;
                    if !self.seen_root {
                        return self.malformed("no root element");
                    }
                    if self.depth != 0 {
                        return self.malformed(format!(
                            "unexpected end of document with {} unclosed element(s)",
                            self.depth
                        ));
                    }
                    return None;
                }
                _ => None,
            };

            match row {
                Some(Ok(row)) => {
                    self.rows_read += 1;
                    self.milestone();
                    return Some(Ok(row));
                }
                Some(Err(msg)) => return self.malformed(msg),
                None => continue,
            }
        }
    }
}

/// Incremental parser for tables that may not fit in memory.
#[derive(Debug, Clone, Copy)]
pub struct StreamingParser {
    pub progress_every: u64,
}

impl StreamingParser {
    pub fn new(progress_every: u64) -> Self {
        Self { progress_every }
    }

    /// Open `path` as a lazy row sequence.
    pub fn rows(&self, path: &Path) -> Result<RowStream<BufReader<File>>> {
        let file = File::open(path).map_err(|e| NormalizeError::io(path, e))?;
        let reader = BufReader::with_capacity(1024 * 1024, file); // 1MB buffer
        Ok(RowStream::new(reader, path, self.progress_every))
    }
}

impl Default for StreamingParser {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_EVERY)
    }
}

impl XmlTableParser for StreamingParser {
    #[instrument(level = "info", skip(self, path), fields(path = %path.display()))]
    fn parse(&self, path: &Path) -> Result<RawTable> {
        let mut stream = self.rows(path)?;
        // rows gathered before an error are dropped with `table`
        let mut table = RawTable::new();
        for row in stream.by_ref() {
            table.push(row?);
        }
        info!(rows = stream.rows_read(), "stream complete");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::fixtures;
    use tempfile::TempDir;

    #[test]
    fn yields_rows_lazily_in_document_order() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = fixtures::write(&dir, "Comments.xml", fixtures::COMMENTS);
        let mut stream = StreamingParser::new(2).rows(&path)?;

        let first = stream.next().unwrap()?;
        assert_eq!(first.get("Id"), Some("1"));
        assert_eq!(stream.rows_read(), 1);

        let second = stream.next().unwrap()?;
        assert_eq!(second.get("Text"), Some(r#"a <b> & "c""#));
        assert_eq!(second.get("UserId"), None);

        let third = stream.next().unwrap()?;
        assert_eq!(third.get("Text"), Some(""));
        assert!(stream.next().is_none());
        assert_eq!(stream.rows_read(), 3);
        Ok(())
    }

    #[test]
    fn stream_stops_after_error() {
        let xml = r#"<posts><row Id="1"/><row Id="2" Bad=/></posts>"#;
        let mut stream = RowStream::new(xml.as_bytes(), "inline.xml", 0);
        assert!(stream.next().unwrap().is_ok());
        assert!(matches!(
            stream.next(),
            Some(Err(NormalizeError::MalformedDocument { .. }))
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = StreamingParser::default()
            .parse(Path::new("/definitely/not/here/Posts.xml"))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Io { .. }));
    }

    #[test]
    fn empty_input_has_no_root() {
        let mut stream = RowStream::new("".as_bytes(), "empty.xml", 0);
        assert!(matches!(
            stream.next(),
            Some(Err(NormalizeError::MalformedDocument { .. }))
        ));
    }
}
