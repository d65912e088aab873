//! Reader for the SIGTAP reference tables.
//!
//! SIGTAP ships each table as a fixed-width text file (`tb_cid.txt`) next to a
//! small CSV describing its columns (`tb_cid_layout.txt`). This crate loads the
//! layouts, slices the data files into string tables, and optionally coerces the
//! declared column types into Arrow batches written as Parquet.

pub mod config;
pub mod error;
pub mod process;
pub mod schema;
pub mod source;

pub use config::{FileNaming, OutputCompression, SigtapConfig, SourceEncoding};
pub use error::{Result, SigtapError};
pub use process::{persist, persist_all, to_record_batch, DecodedTable, Decoder, PersistOptions, Record};
pub use schema::{load_layouts, map_declared_type, ColumnSpec, Layout, TargetType};
pub use source::{DirectorySource, FsDirectory, MemoryDirectory};
