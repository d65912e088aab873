// src/process/persist.rs

use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::{
    collections::BTreeMap,
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

use super::convert::to_record_batch;
use super::table::DecodedTable;
use crate::config::{OutputCompression, SigtapConfig};
use crate::error::{Result, SigtapError};
use crate::schema::Layout;

/// How tables are written to Parquet.
#[derive(Debug, Clone, Copy)]
pub struct PersistOptions {
    /// Coerce declared types; otherwise every column is Utf8.
    pub typed: bool,
    pub compression: OutputCompression,
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            typed: true,
            compression: OutputCompression::Snappy,
        }
    }
}

impl PersistOptions {
    pub fn from_config(cfg: &SigtapConfig) -> Self {
        Self {
            typed: cfg.typed_output,
            compression: cfg.compression,
        }
    }

    fn writer_properties(&self) -> WriterProperties {
        let compression = match self.compression {
            OutputCompression::Snappy => Compression::SNAPPY,
            OutputCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            OutputCompression::Uncompressed => Compression::UNCOMPRESSED,
        };
        WriterProperties::builder()
            .set_compression(compression)
            .set_dictionary_enabled(true)
            .build()
    }
}

/// Write `table` to `<destination>/<table>.parquet` and return the path.
///
/// The file is written under a `.tmp` name and renamed once closed, so a failed
/// write never leaves a truncated `.parquet` behind.
#[instrument(level = "debug", skip_all, fields(table = %table.table_name()))]
pub fn persist(
    table: &DecodedTable,
    layout: &Layout,
    destination: &Path,
    options: &PersistOptions,
) -> Result<PathBuf> {
    let name = table.table_name();
    let batch = to_record_batch(table, layout, options.typed)?;

    fs::create_dir_all(destination).map_err(|e| SigtapError::persistence(name, e))?;
    let out_path = destination.join(format!("{}.parquet", name));
    let temp_path = out_path.with_extension("parquet.tmp");

    let written = (|| -> anyhow::Result<()> {
        let file = File::create(&temp_path)?;
        let mut writer =
            ArrowWriter::try_new(file, batch.schema(), Some(options.writer_properties()))?;
        writer.write(&batch)?;
        writer.close()?;
        fs::rename(&temp_path, &out_path)?;
        Ok(())
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(SigtapError::persistence(name, e));
    }

    debug!(rows = batch.num_rows(), path = %out_path.display(), "wrote parquet");
    Ok(out_path)
}

/// Persist every table with its layout. Stops at the first failure; files
/// written before it are kept.
#[instrument(level = "info", skip_all, fields(destination = %destination.display()))]
pub fn persist_all(
    tables: &BTreeMap<String, DecodedTable>,
    layouts: &BTreeMap<String, Layout>,
    destination: &Path,
    options: &PersistOptions,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(tables.len());
    for (name, table) in tables {
        let layout = layouts.get(name).ok_or_else(|| SigtapError::UnknownTable {
            table: name.clone(),
            entry: name.clone(),
        })?;
        written.push(persist(table, layout, destination, options)?);
    }
    info!(files = written.len(), "persisted tables");
    Ok(written)
}
