// src/schema/layout.rs

use csv::{ReaderBuilder, StringRecord, Trim};
use std::{borrow::Cow, io::Read};
use tracing::{debug, instrument, trace};

use super::types::{ColumnSpec, Layout};
use crate::config::SourceEncoding;
use crate::error::{Result, SigtapError};

const COL_NAME: &str = "Coluna";
const COL_START: &str = "Inicio";
const COL_END: &str = "Fim";
const COL_SIZE: &str = "Tamanho";
const COL_TYPE: &str = "Tipo";

/// Positions of the known fields within the header row.
struct HeaderIndex {
    name: usize,
    start: usize,
    end: usize,
    size: Option<usize>,
    ty: Option<usize>,
}

impl HeaderIndex {
    fn from_record(entry: &str, headers: &StringRecord) -> Result<Self> {
        let find = |wanted: &str| {
            headers.iter().position(|h| {
                h.trim_start_matches('\u{feff}')
                    .trim()
                    .eq_ignore_ascii_case(wanted)
            })
        };
        let required = |wanted: &str| {
            find(wanted).ok_or_else(|| SigtapError::LayoutFormat {
                entry: entry.to_string(),
                reason: format!("missing `{}` header", wanted),
            })
        };
        Ok(Self {
            name: required(COL_NAME)?,
            start: required(COL_START)?,
            end: required(COL_END)?,
            size: find(COL_SIZE),
            ty: find(COL_TYPE),
        })
    }
}

/// Parse one layout description (`Coluna,Tamanho,Inicio,Fim,Tipo`) into a `Layout`.
///
/// The file is read with the same `encoding` as the data files. Under UTF-8 an
/// invalid byte is a `LayoutFormat` error rather than a replaced character.
/// `entry` is only used for error messages; `table` becomes the layout's name.
#[instrument(level = "debug", skip(reader))]
pub fn parse_layout<R: Read>(
    table: &str,
    entry: &str,
    mut reader: R,
    encoding: SourceEncoding,
) -> Result<Layout> {
    let format_err = |e: csv::Error| SigtapError::LayoutFormat {
        entry: entry.to_string(),
        reason: e.to_string(),
    };

    let mut raw = Vec::new();
    reader
        .read_to_end(&mut raw)
        .map_err(|e| SigtapError::io(format!("reading layout {}", entry), e))?;
    let text: Cow<'_, str> = match encoding {
        SourceEncoding::Utf8 => Cow::Borrowed(std::str::from_utf8(&raw).map_err(|e| {
            SigtapError::LayoutFormat {
                entry: entry.to_string(),
                reason: format!("not valid UTF-8: {}", e),
            }
        })?),
        SourceEncoding::Latin1 => encoding.decode(&raw),
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = rdr.headers().map_err(format_err)?.clone();
    let idx = HeaderIndex::from_record(entry, &headers)?;

    let mut columns = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(format_err)?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let name = record.get(idx.name).unwrap_or_default();
        let number = |field: Option<usize>, label: &str| -> Result<Option<usize>> {
            let Some(i) = field else { return Ok(None) };
            let raw = record.get(i).unwrap_or_default();
            raw.parse::<usize>()
                .map(Some)
                .map_err(|_| SigtapError::InvalidLayout {
                    table: table.to_string(),
                    column: name.to_string(),
                    reason: format!("`{}` is not a non-negative integer: `{}`", label, raw),
                })
        };

        let start = number(Some(idx.start), COL_START)?.unwrap_or_default();
        let end = number(Some(idx.end), COL_END)?.unwrap_or_default();
        let declared_type = idx
            .ty
            .and_then(|i| record.get(i))
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let col = ColumnSpec::new(table, name, start, end, declared_type)?;

        if let Some(size) = number(idx.size, COL_SIZE)? {
            if size != col.width() {
                return Err(SigtapError::InvalidLayout {
                    table: table.to_string(),
                    column: col.name().to_string(),
                    reason: format!(
                        "`{}` {} disagrees with range {}..={}",
                        COL_SIZE, size, col.start(), col.end()
                    ),
                });
            }
        }

        trace!(name = %col.name(), start = col.start(), end = col.end(), ty = ?col.declared_type(), "parsed column");
        columns.push(col);
    }

    if columns.is_empty() {
        return Err(SigtapError::LayoutFormat {
            entry: entry.to_string(),
            reason: "no column rows after the header".into(),
        });
    }

    let layout = Layout::new(table, columns)?;
    debug!(columns = layout.columns().len(), width = layout.record_width(), "parsed layout");
    Ok(layout)
}
