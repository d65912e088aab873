use std::sync::Arc;

/// Rows decoded from one data file. All values are trimmed strings.
///
/// Every row has exactly one value per entry of `columns`, in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTable {
    table_name: String,
    columns: Arc<[String]>,
    rows: Vec<Vec<String>>,
}

impl DecodedTable {
    pub(crate) fn new(table_name: String, columns: Arc<[String]>, rows: Vec<Vec<String>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self {
            table_name,
            columns,
            rows,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|values| Record {
            columns: &self.columns,
            values,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> + '_ {
        self.rows.iter().map(move |values| Record {
            columns: &self.columns,
            values,
        })
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &str> + '_> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(move |r| r[idx].as_str()))
    }
}

/// A borrowed view of one row as a column name → value mapping.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [String],
}

impl<'a> Record<'a> {
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i].as_str())
    }

    /// `(column, value)` pairs in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn values(&self) -> &'a [String] {
        self.values
    }
}
