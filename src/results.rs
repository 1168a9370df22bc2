use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::RowValues;

/// A row from a query result.
///
/// Column names are shared across every row of one result set; values keep the order the
/// backend returned them in.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<RowValues>,
}

impl Row {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        Self {
            column_names,
            values,
        }
    }

    /// Value of the named column, if present.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.column_names
            .iter()
            .position(|name| name == column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// The rows returned by a read-only query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    column_names: Arc<Vec<String>>,
    rows: Vec<Row>,
}

impl RowSet {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            column_names: Arc::new(Vec::new()),
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Set the column names shared by rows added afterwards.
    ///
    /// Blank names are replaced with `column_<n>` (1-based).
    pub fn set_column_names(&mut self, names: Vec<String>) {
        let names = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                if name.is_empty() {
                    format!("column_{}", idx + 1)
                } else {
                    name
                }
            })
            .collect();
        self.column_names = Arc::new(names);
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub(crate) fn shared_column_names(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.column_names)
    }

    pub fn add_row_values(&mut self, values: Vec<RowValues>) {
        let row = Row::new(self.shared_column_names(), values);
        self.rows.push(row);
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Serialize for RowSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a RowSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
