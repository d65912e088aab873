// src/schema/registry.rs

use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use super::layout::parse_layout;
use super::types::Layout;
use crate::config::{FileNaming, SourceEncoding};
use crate::error::{Result, SigtapError};
use crate::source::DirectorySource;

/// Load every layout description in `source`, keyed by table name.
///
/// Layout files are decoded with `encoding`, the same one used for the data.
/// Fails if nothing matches the layout pattern, if two entries map to the same
/// table, or if any layout is malformed.
#[instrument(level = "info", skip_all, fields(source = %source.describe()))]
pub fn load_layouts(
    source: &dyn DirectorySource,
    naming: &FileNaming,
    encoding: SourceEncoding,
) -> Result<BTreeMap<String, Layout>> {
    let pattern = naming.layout_pattern();
    let entries = source.list(&pattern)?;
    if entries.is_empty() {
        return Err(SigtapError::LayoutNotFound {
            source_name: source.describe(),
            pattern,
        });
    }

    let mut layouts: BTreeMap<String, Layout> = BTreeMap::new();
    let mut origin: BTreeMap<String, String> = BTreeMap::new();

    for entry in entries {
        let table = naming.layout_table_name(&entry).to_string();
        if let Some(first) = origin.get(&table) {
            return Err(SigtapError::DuplicateLayout {
                table,
                first: first.clone(),
                second: entry,
            });
        }

        let layout = {
            let reader = source
                .open(&entry)
                .map_err(|e| SigtapError::io(format!("opening layout {}", entry), e))?;
            parse_layout(&table, &entry, reader, encoding)?
        };
        debug!(table = %table, entry = %entry, columns = layout.columns().len(), "registered layout");

        origin.insert(table.clone(), entry);
        layouts.insert(table, layout);
    }

    info!(layouts = layouts.len(), "layouts loaded");
    Ok(layouts)
}
