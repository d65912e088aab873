// src/process/decode.rs

use std::{
    collections::BTreeMap,
    io::{self, BufRead},
    sync::Arc,
};
use tracing::{debug, info, instrument, trace};

use super::table::DecodedTable;
use crate::config::{FileNaming, SigtapConfig, SourceEncoding};
use crate::error::{Result, SigtapError};
use crate::schema::Layout;
use crate::source::DirectorySource;

/// Slices fixed-width lines into trimmed string fields according to a `Layout`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    strict: bool,
    encoding: SourceEncoding,
    skip_blank_lines: bool,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &SigtapConfig) -> Self {
        Self {
            strict: cfg.strict,
            encoding: cfg.encoding,
            skip_blank_lines: cfg.skip_blank_lines,
        }
    }

    /// Reject lines shorter than the layout's record width instead of truncating.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn encoding(mut self, encoding: SourceEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Drop blank lines in `decode_directory` before they reach `decode`.
    pub fn skip_blank_lines(mut self, skip: bool) -> Self {
        self.skip_blank_lines = skip;
        self
    }

    /// Decode one line source into a table with one record per line, in order.
    ///
    /// Lines shorter than a column's end yield whatever part of the column is
    /// present (possibly `""`), unless the decoder is strict.
    pub fn decode<I, L>(&self, layout: &Layout, lines: I) -> Result<DecodedTable>
    where
        I: IntoIterator<Item = io::Result<L>>,
        L: AsRef<[u8]>,
    {
        let table = layout.table_name();
        let required = layout.record_width();
        let columns: Arc<[String]> = layout.column_names().into();
        let mut rows = Vec::new();

        for (idx, line) in lines.into_iter().enumerate() {
            let line = line.map_err(|source| SigtapError::ColumnMismatch {
                table: table.to_string(),
                source,
            })?;
            let bytes = line.as_ref();

            if self.strict && bytes.len() < required {
                return Err(SigtapError::ShortRecord {
                    table: table.to_string(),
                    line: idx + 1,
                    len: bytes.len(),
                    required,
                });
            }

            let row: Vec<String> = layout
                .columns()
                .iter()
                .map(|col| {
                    let range = col.byte_range();
                    let end = range.end.min(bytes.len());
                    let raw = if range.start < end {
                        &bytes[range.start..end]
                    } else {
                        &[][..]
                    };
                    self.encoding.decode(raw).trim().to_string()
                })
                .collect();
            rows.push(row);
        }

        trace!(table, rows = rows.len(), "decoded lines");
        Ok(DecodedTable::new(table.to_string(), columns, rows))
    }

    /// Decode a reader, splitting on `\n` and dropping one trailing `\r` per line.
    pub fn decode_reader<R: BufRead>(&self, layout: &Layout, reader: R) -> Result<DecodedTable> {
        self.decode(layout, byte_lines(reader))
    }

    /// Decode every data entry of `source` with the layout of the same name.
    ///
    /// Fails fast on the first entry without a layout or that cannot be read.
    #[instrument(level = "info", skip_all, fields(source = %source.describe()))]
    pub fn decode_directory(
        &self,
        layouts: &BTreeMap<String, Layout>,
        source: &dyn DirectorySource,
        naming: &FileNaming,
    ) -> Result<BTreeMap<String, DecodedTable>> {
        let mut tables = BTreeMap::new();

        for entry in source.list(&naming.data_pattern())? {
            if naming.is_layout(&entry) {
                continue;
            }
            let table = naming.data_table_name(&entry).to_string();
            let layout = layouts
                .get(&table)
                .ok_or_else(|| SigtapError::UnknownTable {
                    table: table.clone(),
                    entry: entry.clone(),
                })?;

            let decoded = {
                let reader = source
                    .open(&entry)
                    .map_err(|source| SigtapError::ColumnMismatch {
                        table: table.clone(),
                        source,
                    })?;
                if self.skip_blank_lines {
                    self.decode(layout, byte_lines(reader).filter(non_blank))?
                } else {
                    self.decode_reader(layout, reader)?
                }
            };
            debug!(table = %table, entry = %entry, rows = decoded.len(), "decoded table");
            tables.insert(table, decoded);
        }

        info!(tables = tables.len(), "directory decoded");
        Ok(tables)
    }
}

/// Lines of `reader` without their `\n` / `\r\n` terminator.
pub fn byte_lines<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<Vec<u8>>> {
    reader.split(b'\n').map(|line| {
        line.map(|mut bytes| {
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            bytes
        })
    })
}

fn non_blank(line: &io::Result<Vec<u8>>) -> bool {
    match line {
        Ok(bytes) => !bytes.iter().all(u8::is_ascii_whitespace),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;
    use crate::source::{FsDirectory, MemoryDirectory};
    use std::{fs, io::Cursor};
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,sigtap::process=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn id_nome() -> Layout {
        Layout::new(
            "rel",
            vec![
                ColumnSpec::new("rel", "id", 1, 2, None).unwrap(),
                ColumnSpec::new("rel", "nome", 3, 6, None).unwrap(),
            ],
        )
        .unwrap()
    }

    fn lines(text: &[&str]) -> Vec<io::Result<Vec<u8>>> {
        text.iter().map(|l| Ok(l.as_bytes().to_vec())).collect()
    }

    #[test]
    fn full_line_slices_exact_offsets() -> anyhow::Result<()> {
        let table = Decoder::new().decode(&id_nome(), lines(&["01ABCD"]))?;
        let rec = table.record(0).unwrap();
        assert_eq!(rec.get("id"), Some("01"));
        assert_eq!(rec.get("nome"), Some("ABCD"));
        assert_eq!(rec.values().len(), 2);
        Ok(())
    }

    #[test]
    fn short_line_yields_partial_field() -> anyhow::Result<()> {
        let table = Decoder::new().decode(&id_nome(), lines(&["01AB", "0", ""]))?;
        assert_eq!(table.rows()[0], vec!["01", "AB"]);
        assert_eq!(table.rows()[1], vec!["0", ""]);
        assert_eq!(table.rows()[2], vec!["", ""]);
        Ok(())
    }

    #[test]
    fn values_are_trimmed() -> anyhow::Result<()> {
        let table = Decoder::new().decode(&id_nome(), lines(&["1  AB  trailing"]))?;
        assert_eq!(table.rows()[0], vec!["1", "AB"]);
        Ok(())
    }

    #[test]
    fn strict_mode_rejects_short_lines() {
        let err = Decoder::new()
            .strict(true)
            .decode(&id_nome(), lines(&["01ABCD", "01AB"]))
            .unwrap_err();
        match err {
            SigtapError::ShortRecord {
                table,
                line,
                len,
                required,
            } => {
                assert_eq!(table, "rel");
                assert_eq!((line, len, required), (2, 4, 6));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn read_failure_is_column_mismatch() {
        let input: Vec<io::Result<Vec<u8>>> = vec![
            Ok(b"01ABCD".to_vec()),
            Err(io::Error::new(io::ErrorKind::Other, "disk gone")),
        ];
        let err = Decoder::new().decode(&id_nome(), input).unwrap_err();
        assert!(matches!(err, SigtapError::ColumnMismatch { ref table, .. } if table == "rel"));
    }

    #[test]
    fn reader_handles_crlf_blank_lines_and_missing_final_newline() -> anyhow::Result<()> {
        let input = Cursor::new(b"01ABCD\r\n\r\n02WXYZ".to_vec());
        let table = Decoder::new().decode_reader(&id_nome(), input)?;
        assert_eq!(
            table.rows(),
            &[
                vec!["01".to_string(), "ABCD".to_string()],
                vec![String::new(), String::new()],
                vec!["02".to_string(), "WXYZ".to_string()],
            ]
        );

        let trailing = Decoder::new().decode_reader(&id_nome(), Cursor::new(b"01ABCD\n".to_vec()))?;
        assert_eq!(trailing.len(), 1);
        Ok(())
    }

    #[test]
    fn decoding_is_deterministic() -> anyhow::Result<()> {
        let text = b"01ABCD\n02EF\n\n03GHIJ\n".to_vec();
        let decoder = Decoder::new();
        let first = decoder.decode_reader(&id_nome(), Cursor::new(text.clone()))?;
        let second = decoder.decode_reader(&id_nome(), Cursor::new(text))?;
        assert_eq!(first.rows(), second.rows());
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn latin1_fields_decode_to_unicode() -> anyhow::Result<()> {
        let layout = Layout::new(
            "tb_cid",
            vec![
                ColumnSpec::new("tb_cid", "CO_CID", 1, 4, None)?,
                ColumnSpec::new("tb_cid", "NO_CID", 5, 14, None)?,
            ],
        )?;
        // "A00 " + "CÓLERA" in Latin-1, space padded
        let mut line = b"A00 C".to_vec();
        line.push(0xD3);
        line.extend_from_slice(b"LERA    ");
        let table = Decoder::new()
            .encoding(SourceEncoding::Latin1)
            .decode(&layout, vec![Ok::<_, io::Error>(line.clone())])?;
        assert_eq!(table.rows()[0], vec!["A00", "CÓLERA"]);

        // the same bytes read as UTF-8 are replaced, not rejected
        let lossy = Decoder::new().decode(&layout, vec![Ok::<_, io::Error>(line)])?;
        assert_eq!(lossy.rows()[0][1], "C\u{fffd}LERA");
        Ok(())
    }

    #[test]
    fn directory_decodes_each_table_with_its_layout() -> anyhow::Result<()> {
        init_test_logging();
        let dir = MemoryDirectory::new()
            .with_entry("rel_layout.txt", "Coluna,Inicio,Fim\nid,1,2\nnome,3,6\n")
            .with_entry("rel.txt", "01ABCD\n02EF\n")
            .with_entry("tb_x_layout.txt", "Coluna,Inicio,Fim\ncod,1,3\n")
            .with_entry("tb_x.txt", "999\n");
        let naming = FileNaming::default();
        let layouts = crate::schema::load_layouts(&dir, &naming, SourceEncoding::Utf8)?;

        let tables = Decoder::new().decode_directory(&layouts, &dir, &naming)?;
        assert_eq!(tables.len(), 2);
        assert_eq!(tables["rel"].rows()[1], vec!["02", "EF"]);
        assert_eq!(tables["tb_x"].columns(), &["cod".to_string()]);
        assert_eq!(tables["tb_x"].table_name(), "tb_x");
        Ok(())
    }

    #[test]
    fn directory_skips_blank_lines_only_when_asked() -> anyhow::Result<()> {
        let dir = MemoryDirectory::new()
            .with_entry("rel_layout.txt", "Coluna,Inicio,Fim\nid,1,2\nnome,3,6\n")
            .with_entry("rel.txt", "01ABCD\n   \n02EF\n");
        let naming = FileNaming::default();
        let layouts = crate::schema::load_layouts(&dir, &naming, SourceEncoding::Utf8)?;

        let kept = Decoder::new().decode_directory(&layouts, &dir, &naming)?;
        assert_eq!(kept["rel"].len(), 3);

        let skipped = Decoder::new()
            .skip_blank_lines(true)
            .decode_directory(&layouts, &dir, &naming)?;
        assert_eq!(skipped["rel"].len(), 2);
        Ok(())
    }

    #[test]
    fn data_file_without_layout_is_unknown_table() -> anyhow::Result<()> {
        let dir = MemoryDirectory::new()
            .with_entry("tb_x_layout.txt", "Coluna,Inicio,Fim\ncod,1,3\n")
            .with_entry("rel.txt", "01ABCD\n");
        let naming = FileNaming::default();
        let layouts = crate::schema::load_layouts(&dir, &naming, SourceEncoding::Utf8)?;

        let err = Decoder::new()
            .decode_directory(&layouts, &dir, &naming)
            .unwrap_err();
        match err {
            SigtapError::UnknownTable { table, entry } => {
                assert_eq!(table, "rel");
                assert_eq!(entry, "rel.txt");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        Ok(())
    }

    /// Lists one data entry but cannot open it.
    struct UnreadableEntry;

    impl DirectorySource for UnreadableEntry {
        fn describe(&self) -> String {
            "unreadable".into()
        }

        fn list(&self, _pattern: &str) -> Result<Vec<String>> {
            Ok(vec!["rel.txt".into()])
        }

        fn open(&self, _entry: &str) -> io::Result<Box<dyn BufRead + '_>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
        }
    }

    #[test]
    fn unopenable_entry_is_column_mismatch() {
        let layouts = BTreeMap::from([("rel".to_string(), id_nome())]);
        let err = Decoder::new()
            .decode_directory(&layouts, &UnreadableEntry, &FileNaming::default())
            .unwrap_err();
        match err {
            SigtapError::ColumnMismatch { table, source } => {
                assert_eq!(table, "rel");
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn layouts_from_the_public_api_never_slice_out_of_range() -> anyhow::Result<()> {
        // zero start and reversed ranges cannot be built, so every
        // decodable column has a valid 0-based range
        assert!(ColumnSpec::new("rel", "id", 0, 2, None).is_err());
        assert!(ColumnSpec::new("rel", "id", 3, 1, None).is_err());

        let layout = Layout::new("rel", vec![ColumnSpec::new("rel", "id", 1, 1, None)?])?;
        let table = Decoder::new().decode(&layout, lines(&["", "X", "XY"]))?;
        let ids: Vec<&str> = table.column_values("id").unwrap().collect();
        assert_eq!(ids, vec!["", "X", "X"]);
        Ok(())
    }

    #[test]
    fn directory_on_disk_in_strict_mode() -> anyhow::Result<()> {
        init_test_logging();
        let tmp = tempdir()?;
        fs::write(tmp.path().join("rel_layout.txt"), "Coluna,Inicio,Fim\nid,1,2\nnome,3,6\n")?;
        fs::write(tmp.path().join("rel.txt"), "01ABCD\r\n02EFGH\r\n")?;

        let dir = FsDirectory::new(tmp.path());
        let cfg = SigtapConfig {
            strict: true,
            ..SigtapConfig::default()
        };
        let layouts = crate::schema::load_layouts(&dir, &cfg.naming, SourceEncoding::Utf8)?;
        let tables = Decoder::from_config(&cfg).decode_directory(&layouts, &dir, &cfg.naming)?;
        assert_eq!(tables["rel"].rows()[1], vec!["02", "EFGH"]);

        fs::write(tmp.path().join("rel.txt"), "01ABCD\r\n02EF\r\n")?;
        let err = Decoder::from_config(&cfg)
            .decode_directory(&layouts, &dir, &cfg.naming)
            .unwrap_err();
        assert!(matches!(err, SigtapError::ShortRecord { line: 2, .. }));
        Ok(())
    }
}
