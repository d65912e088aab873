use serde::Serialize;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

use super::arrow::{target_type, TargetType};
use super::Layout;
use crate::error::{Result, SigtapError};

/// One column as written to `<table>_columns.json`.
#[derive(Debug, Serialize)]
struct ColumnDescription<'a> {
    name: &'a str,
    start: usize,
    end: usize,
    width: usize,
    declared_type: Option<&'a str>,
    target_type: TargetType,
}

#[derive(Debug, Serialize)]
struct LayoutDescription<'a> {
    table: &'a str,
    record_width: usize,
    columns: Vec<ColumnDescription<'a>>,
}

/// Write the layout of `layout.table_name()` with its mapped target types.
///
/// - `dir`: created if missing; the file is `<table>_columns.json`
/// - written to a hidden tmp file first, then renamed over the target
pub fn write_layout_json<P: AsRef<Path>>(layout: &Layout, dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let table = layout.table_name();
    let fail = |e: anyhow::Error| SigtapError::persistence(table, e);

    fs::create_dir_all(dir)
        .map_err(|e| fail(anyhow::Error::new(e).context(format!("creating {:?}", dir))))?;

    let description = LayoutDescription {
        table,
        record_width: layout.record_width(),
        columns: layout
            .columns()
            .iter()
            .map(|c| ColumnDescription {
                name: c.name(),
                start: c.start(),
                end: c.end(),
                width: c.width(),
                declared_type: c.declared_type(),
                target_type: target_type(c.declared_type()),
            })
            .collect(),
    };

    let path = dir.join(format!("{}_columns.json", table));
    let tmp_path = dir.join(format!(".{}_columns.json.tmp", table));
    {
        let mut tmp = fs::File::create(&tmp_path).map_err(|e| {
            fail(anyhow::Error::new(e).context(format!("creating {:?}", tmp_path)))
        })?;
        serde_json::to_writer_pretty(&mut tmp, &description)
            .map_err(|e| fail(anyhow::Error::new(e).context("serializing JSON")))?;
        tmp.write_all(b"\n")
            .map_err(|e| fail(anyhow::Error::new(e)))?;
    }

    fs::rename(&tmp_path, &path).map_err(|e| {
        fail(anyhow::Error::new(e).context(format!("renaming {:?} -> {:?}", tmp_path, path)))
    })?;
    debug!(table, path = %path.display(), "wrote layout description");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;
    use tempfile::tempdir;

    #[test]
    fn writes_description_with_target_types() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let layout = Layout::new(
            "tb_cid",
            vec![
                ColumnSpec::new("tb_cid", "CO_CID", 1, 4, Some("VARCHAR2".into()))?,
                ColumnSpec::new("tb_cid", "QT_CAMPOS", 5, 8, Some("NUMBER(4)".into()))?,
                ColumnSpec::new("tb_cid", "OBS", 9, 20, None)?,
            ],
        )?;

        let out = tmp.path().join("schemas");
        let path = write_layout_json(&layout, &out)?;
        assert_eq!(path, out.join("tb_cid_columns.json"));
        assert!(!out.join(".tb_cid_columns.json.tmp").exists());

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(json["table"], "tb_cid");
        assert_eq!(json["record_width"], 20);
        assert_eq!(json["columns"][0]["target_type"], "text");
        assert_eq!(json["columns"][1]["target_type"], "integer");
        assert_eq!(json["columns"][1]["width"], 4);
        assert!(json["columns"][2]["declared_type"].is_null());
        Ok(())
    }

    #[test]
    fn unwritable_dir_is_persistence_error() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let layout = Layout::new(
            "tb_cid",
            vec![ColumnSpec::new("tb_cid", "CO_CID", 1, 4, None)?],
        )?;
        let blocked = tmp.path().join("schemas");
        fs::write(&blocked, b"")?;

        let err = write_layout_json(&layout, &blocked).unwrap_err();
        assert!(matches!(err, SigtapError::Persistence { ref table, .. } if table == "tb_cid"));
        assert!(blocked.is_file());
        assert!(!tmp.path().join(".tb_cid_columns.json.tmp").exists());
        Ok(())
    }
}
