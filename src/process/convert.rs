// src/process/convert.rs

use arrow::{
    array::{
        ArrayRef, Date32Builder, Float64Builder, Int64Builder, StringArray,
        TimestampMicrosecondBuilder,
    },
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::date_parser;
use super::table::DecodedTable;
use crate::error::{Result, SigtapError};
use crate::schema::{build_arrow_schema, target_type, Layout, TargetType};

/// Convert a decoded table into an Arrow batch using the layout's declared types.
///
/// Text columns keep their raw (possibly empty) strings. For every other type an
/// empty cell becomes null, and so does a value that fails to parse; failures are
/// reported once per column.
pub fn to_record_batch(table: &DecodedTable, layout: &Layout, typed: bool) -> Result<RecordBatch> {
    if table.columns().len() != layout.columns().len()
        || table
            .columns()
            .iter()
            .zip(layout.columns())
            .any(|(name, col)| name != col.name())
    {
        return Err(SigtapError::LayoutMismatch {
            table: table.table_name().to_string(),
            layout: layout.table_name().to_string(),
            expected: layout.column_names().join(","),
            found: table.columns().join(","),
        });
    }

    let schema = build_arrow_schema(layout, typed);
    let mut out: Vec<ArrayRef> = Vec::with_capacity(layout.columns().len());

    for (idx, col) in layout.columns().iter().enumerate() {
        let ty = if typed {
            target_type(col.declared_type())
        } else {
            TargetType::Text
        };
        let values = table.rows().iter().map(|r| r[idx].as_str());
        let mut bad = BadValues::default();

        let array: ArrayRef = match ty {
            TargetType::Text => Arc::new(values.map(Some).collect::<StringArray>()),
            TargetType::Integer => {
                let mut b = Int64Builder::with_capacity(table.len());
                for v in values {
                    b.append_option(bad.check(v, parse_integer(v)));
                }
                Arc::new(b.finish())
            }
            TargetType::Decimal => {
                let mut b = Float64Builder::with_capacity(table.len());
                for v in values {
                    b.append_option(bad.check(v, parse_decimal(v)));
                }
                Arc::new(b.finish())
            }
            TargetType::Date => {
                let mut b = Date32Builder::with_capacity(table.len());
                for v in values {
                    b.append_option(bad.check(v, date_parser::parse_date_days(v)));
                }
                Arc::new(b.finish())
            }
            TargetType::Timestamp => {
                let mut b = TimestampMicrosecondBuilder::with_capacity(table.len());
                for v in values {
                    b.append_option(bad.check(v, date_parser::parse_timestamp_micros(v)));
                }
                Arc::new(b.finish())
            }
        };

        if bad.count > 0 {
            warn!(
                table = %table.table_name(),
                column = %col.name(),
                target = %ty,
                count = bad.count,
                first = ?bad.first,
                "unparseable values stored as null"
            );
        }
        out.push(array);
    }

    debug!(table = %table.table_name(), rows = table.len(), typed, "built record batch");
    RecordBatch::try_new(schema, out)
        .map_err(|e| SigtapError::persistence(table.table_name(), e))
}

/// Tracks values that were non-empty but failed to parse.
#[derive(Default)]
struct BadValues {
    count: usize,
    first: Option<String>,
}

impl BadValues {
    fn check<T>(&mut self, raw: &str, parsed: Option<T>) -> Option<T> {
        if parsed.is_none() && !raw.is_empty() {
            self.count += 1;
            if self.first.is_none() {
                self.first = Some(raw.to_string());
            }
        }
        parsed
    }
}

fn parse_integer(s: &str) -> Option<i64> {
    if s.is_empty() {
        return None;
    }
    s.strip_prefix('+').unwrap_or(s).parse().ok()
}

/// Accepts `.` or `,` as the decimal separator.
fn parse_decimal(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    if s.contains(',') && !s.contains('.') {
        s.replace(',', ".").parse().ok()
    } else {
        s.parse().ok()
    }
}
