// src/schema/arrow.rs

use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema, TimeUnit};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

use super::types::Layout;

/// Storage type a declared column type resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Text,
    Integer,
    Decimal,
    Date,
    Timestamp,
}

impl TargetType {
    pub fn arrow_type(self) -> DataType {
        match self {
            TargetType::Text => DataType::Utf8,
            TargetType::Integer => DataType::Int64,
            TargetType::Decimal => DataType::Float64,
            TargetType::Date => DataType::Date32,
            TargetType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetType::Text => "text",
            TargetType::Integer => "integer",
            TargetType::Decimal => "decimal",
            TargetType::Date => "date",
            TargetType::Timestamp => "timestamp",
        };
        f.write_str(s)
    }
}

/// `NUMBER(10,2)` → ("NUMBER", ["10", "2"])
static DECLARED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_ ]*?)\s*(?:\(\s*([^)]*?)\s*\))?\s*$")
        .expect("static regex")
});

/// Map a declared (Oracle-style) column type to a `TargetType`.
///
/// Total: anything unrecognised is Text.
/// - DATE                                   → Date
/// - TIMESTAMP*                             → Timestamp
/// - NUMBER(p) / NUMBER(p,0)                → Integer
/// - NUMBER, NUMERIC*, DECIMAL*, FLOAT, DOUBLE, BINARY_* → Decimal
/// - INTEGER, INT, BIGINT, SMALLINT, TINYINT → Integer
/// - CHAR*, VARCHAR*, VARCHAR2, CLOB, fallback → Text
pub fn map_declared_type(declared: &str) -> TargetType {
    let Some(caps) = DECLARED.captures(declared) else {
        return TargetType::Text;
    };
    let base = caps
        .get(1)
        .map(|m| m.as_str().to_ascii_uppercase())
        .unwrap_or_default();
    let args: Vec<&str> = caps
        .get(2)
        .map(|m| m.as_str().split(',').map(str::trim).collect())
        .unwrap_or_default();

    if base == "DATE" {
        TargetType::Date
    } else if base.starts_with("TIMESTAMP") {
        TargetType::Timestamp
    } else if base == "NUMBER" || base.starts_with("NUMERIC") || base.starts_with("DECIMAL") {
        let integral = match args.as_slice() {
            [p] => !p.is_empty() && *p != "*",
            [_, s] => *s == "0",
            _ => false,
        };
        if integral {
            TargetType::Integer
        } else {
            TargetType::Decimal
        }
    } else if matches!(
        base.as_str(),
        "FLOAT" | "DOUBLE" | "DOUBLE PRECISION" | "REAL" | "BINARY_FLOAT" | "BINARY_DOUBLE"
    ) {
        TargetType::Decimal
    } else if matches!(
        base.as_str(),
        "INTEGER" | "INT" | "BIGINT" | "SMALLINT" | "TINYINT"
    ) {
        TargetType::Integer
    } else {
        // CHAR, VARCHAR, VARCHAR2, CLOB and anything unknown
        TargetType::Text
    }
}

/// Target type of an optional declared type; columns without one are Text.
pub fn target_type(declared: Option<&str>) -> TargetType {
    declared.map_or(TargetType::Text, map_declared_type)
}

/// Build an Arrow schema for `layout`. With `typed == false` every field is Utf8.
pub fn build_arrow_schema(layout: &Layout, typed: bool) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = layout
        .columns()
        .iter()
        .map(|col| {
            let dt = if typed {
                target_type(col.declared_type()).arrow_type()
            } else {
                DataType::Utf8
            };
            ArrowField::new(col.name(), dt, /* nullable = */ true)
        })
        .collect();

    Arc::new(ArrowSchema::new(fields))
}
