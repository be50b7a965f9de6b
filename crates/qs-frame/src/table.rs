//! In-memory columnar event table.

use std::collections::HashMap;

use crate::error::{FrameError, Result};

/// A set of equally long `f64` columns, one row per event.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    n_rows: usize,
    names: Vec<String>,
    columns: HashMap<String, Vec<f64>>,
}

impl EventTable {
    /// Empty table with zero rows and no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(name, values)` pairs. All columns must have the
    /// same length.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let mut table = Self::new();
        for (name, values) in columns {
            table.insert(name, values)?;
        }
        Ok(table)
    }

    /// Add or replace a column.
    ///
    /// The first column fixes the row count; later columns must match it.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if self.names.is_empty() {
            self.n_rows = values.len();
        } else if values.len() != self.n_rows {
            return Err(FrameError::LengthMismatch {
                column: name,
                expected: self.n_rows,
                found: values.len(),
            });
        }
        if self.columns.insert(name.clone(), values).is_none() {
            self.names.push(name);
        }
        Ok(())
    }

    /// Append the rows of `other`. Both tables must carry the same columns.
    pub fn append(&mut self, other: EventTable) -> Result<()> {
        if self.names.is_empty() {
            *self = other;
            return Ok(());
        }
        for name in &self.names {
            if !other.columns.contains_key(name) {
                return Err(FrameError::ColumnNotFound(name.clone()));
            }
        }
        let mut other = other;
        for name in &self.names {
            if let Some(extra) = other.columns.remove(name)
                && let Some(col) = self.columns.get_mut(name)
            {
                col.extend(extra);
            }
        }
        self.n_rows += other.n_rows;
        Ok(())
    }

    /// Number of rows (events).
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// `true` if a column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Borrow a column by name.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| FrameError::ColumnNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_mismatch_rejected() {
        let mut t = EventTable::new();
        t.insert("a", vec![1.0, 2.0]).unwrap();
        let err = t.insert("b", vec![1.0]).unwrap_err();
        assert!(matches!(err, FrameError::LengthMismatch { expected: 2, found: 1, .. }));
    }

    #[test]
    fn replace_keeps_order() {
        let mut t = EventTable::new();
        t.insert("a", vec![1.0]).unwrap();
        t.insert("b", vec![2.0]).unwrap();
        t.insert("a", vec![3.0]).unwrap();
        assert_eq!(t.column_names(), ["a", "b"]);
        assert_eq!(t.column("a").unwrap(), [3.0]);
    }

    #[test]
    fn append_concatenates_rows() {
        let mut t =
            EventTable::from_columns(vec![("x".into(), vec![1.0]), ("y".into(), vec![2.0])])
                .unwrap();
        let u = EventTable::from_columns(vec![
            ("y".into(), vec![4.0, 6.0]),
            ("x".into(), vec![3.0, 5.0]),
        ])
        .unwrap();
        t.append(u).unwrap();
        assert_eq!(t.n_rows(), 3);
        assert_eq!(t.column("x").unwrap(), [1.0, 3.0, 5.0]);
        assert_eq!(t.column("y").unwrap(), [2.0, 4.0, 6.0]);
    }
}
