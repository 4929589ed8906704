// src/table/raw.rs

use std::collections::HashSet;

/// One row element's attributes, in document order.
///
/// Rows are small (a couple of dozen attributes at most), so lookups are a
/// linear scan over the pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    attrs: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute; a repeated name overwrites the earlier value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attrs.iter().map(|(n, _)| n.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// Rows in document order plus the union of attribute names seen across them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Column names in first-seen order.
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
    seen: HashSet<String>,
}

impl RawTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: RawRow) {
        for name in row.names() {
            if !self.seen.contains(name) {
                self.seen.insert(name.to_string());
                self.columns.push(name.to_string());
            }
        }
        self.rows.push(row);
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.seen.contains(name)
    }
}

impl FromIterator<RawRow> for RawTable {
    fn from_iter<I: IntoIterator<Item = RawRow>>(iter: I) -> Self {
        let mut table = RawTable::new();
        for row in iter {
            table.push(row);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_union_in_first_seen_order() {
        let table: RawTable = vec![
            RawRow::from_iter([("Id", "1"), ("Score", "3")]),
            RawRow::from_iter([("Id", "2"), ("ParentId", "1"), ("Score", "0")]),
            RawRow::from_iter([("Title", "t"), ("Id", "3")]),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.columns, vec!["Id", "Score", "ParentId", "Title"]);
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.rows[0].get("ParentId"), None);
        assert_eq!(table.rows[1].get("ParentId"), Some("1"));
    }

    #[test]
    fn empty_value_is_kept_distinct_from_missing() {
        let row = RawRow::from_iter([("Text", "")]);
        assert_eq!(row.get("Text"), Some(""));
        assert_eq!(row.get("Other"), None);
    }
}
