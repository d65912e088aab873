// src/schema/types.rs

use std::ops::Range;

use crate::error::{Result, SigtapError};

/// One fixed-width column: a name plus a 1-based inclusive byte range.
///
/// Only `ColumnSpec::new` builds one, so `1 <= start <= end` always holds.
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct ColumnSpec {
    name: String,
    start: usize,
    end: usize,
    declared_type: Option<String>,
}

impl ColumnSpec {
    /// Build a column, rejecting empty names and malformed ranges.
    pub fn new(
        table: &str,
        name: impl Into<String>,
        start: usize,
        end: usize,
        declared_type: Option<String>,
    ) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: String| SigtapError::InvalidLayout {
            table: table.to_string(),
            column: name.clone(),
            reason,
        };
        if name.trim().is_empty() {
            return Err(invalid("empty column name".into()));
        }
        if start < 1 {
            return Err(invalid(format!("start must be >= 1, got {}", start)));
        }
        if end < start {
            return Err(invalid(format!("end {} is before start {}", end, start)));
        }
        Ok(Self {
            name,
            start,
            end,
            declared_type,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 1-based first byte.
    pub fn start(&self) -> usize {
        self.start
    }

    /// 1-based last byte, inclusive.
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn width(&self) -> usize {
        self.end - self.start + 1
    }

    /// 0-based, half-open byte range.
    pub fn byte_range(&self) -> Range<usize> {
        self.start - 1..self.end
    }
}

/// The record format of one table. Never empty, column names unique.
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Layout {
    table_name: String,
    columns: Vec<ColumnSpec>,
}

impl Layout {
    /// Assemble a layout from at least one column; column names must be unique.
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnSpec>) -> Result<Self> {
        let table_name = table_name.into();
        if columns.is_empty() {
            return Err(SigtapError::InvalidLayout {
                table: table_name,
                column: String::new(),
                reason: "layout has no columns".into(),
            });
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|prev| prev.name == col.name) {
                return Err(SigtapError::InvalidLayout {
                    table: table_name,
                    column: col.name.clone(),
                    reason: "duplicate column name".into(),
                });
            }
        }
        Ok(Self {
            table_name,
            columns,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Bytes a line needs so that no column is truncated.
    pub fn record_width(&self) -> usize {
        self.columns.iter().map(|c| c.end).max().unwrap_or(0)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}
