pub mod convert;
pub mod date_parser;
pub mod decode;
pub mod persist;
pub mod table;

pub use convert::to_record_batch;
pub use decode::{byte_lines, Decoder};
pub use persist::{persist, persist_all, PersistOptions};
pub use table::{DecodedTable, Record};
