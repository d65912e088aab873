// src/config.rs

use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::{Result, SigtapError};

/// Text encoding of the layout and data files. SIGTAP itself ships as Latin-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SourceEncoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "latin1", alias = "iso-8859-1", alias = "windows-1252")]
    Latin1,
}

impl std::str::FromStr for SourceEncoding {
    type Err = SigtapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(SourceEncoding::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" | "windows-1252" => Ok(SourceEncoding::Latin1),
            other => Err(SigtapError::Config(format!("unknown encoding `{}`", other))),
        }
    }
}

impl SourceEncoding {
    /// Decode `raw` into text. Invalid UTF-8 becomes U+FFFD; Latin-1 never fails.
    pub fn decode<'a>(&self, raw: &'a [u8]) -> Cow<'a, str> {
        match self {
            SourceEncoding::Utf8 => String::from_utf8_lossy(raw),
            SourceEncoding::Latin1 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling(raw)
                .0,
        }
    }
}

/// Parquet compression codec used by `persist`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputCompression {
    #[default]
    Snappy,
    Zstd,
    Uncompressed,
}

impl std::str::FromStr for OutputCompression {
    type Err = SigtapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snappy" => Ok(OutputCompression::Snappy),
            "zstd" => Ok(OutputCompression::Zstd),
            "none" | "uncompressed" => Ok(OutputCompression::Uncompressed),
            other => Err(SigtapError::Config(format!("unknown compression `{}`", other))),
        }
    }
}

/// File naming conventions shared by the registry and the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileNaming {
    /// Stem suffix marking a layout description, e.g. `tb_cid_layout.txt`.
    pub layout_suffix: String,
    /// Extension shared by layout and data files, without the dot. May be a glob such as `*`.
    pub extension: String,
}

impl Default for FileNaming {
    fn default() -> Self {
        Self {
            layout_suffix: "_layout".into(),
            extension: "txt".into(),
        }
    }
}

impl FileNaming {
    pub fn layout_pattern(&self) -> String {
        format!("*{}.{}", self.layout_suffix, self.extension)
    }

    pub fn data_pattern(&self) -> String {
        format!("*.{}", self.extension)
    }

    /// Stem of `entry`: the base name minus its last extension.
    pub fn stem<'a>(&self, entry: &'a str) -> &'a str {
        let base = entry.rsplit(['/', '\\']).next().unwrap_or(entry);
        match base.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => base,
        }
    }

    pub fn is_layout(&self, entry: &str) -> bool {
        self.stem(entry).ends_with(self.layout_suffix.as_str())
    }

    /// Table name for a layout entry: stem with the layout suffix stripped.
    pub fn layout_table_name<'a>(&self, entry: &'a str) -> &'a str {
        let stem = self.stem(entry);
        stem.strip_suffix(self.layout_suffix.as_str()).unwrap_or(stem)
    }

    /// Table name for a data entry.
    pub fn data_table_name<'a>(&self, entry: &'a str) -> &'a str {
        self.stem(entry)
    }
}

/// Runtime configuration. Every field has a default; a YAML file may override any of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SigtapConfig {
    pub source_dir: PathBuf,
    pub naming: FileNaming,
    /// Reject lines shorter than the layout's record width.
    pub strict: bool,
    pub skip_blank_lines: bool,
    pub encoding: SourceEncoding,
    pub output_dir: PathBuf,
    /// Coerce declared types on export; `false` writes every column as Utf8.
    pub typed_output: bool,
    pub compression: OutputCompression,
}

impl Default for SigtapConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("sigtap-simplificado"),
            naming: FileNaming::default(),
            strict: false,
            skip_blank_lines: false,
            encoding: SourceEncoding::Utf8,
            output_dir: PathBuf::from("parquet"),
            typed_output: true,
            compression: OutputCompression::Snappy,
        }
    }
}

impl SigtapConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg: SigtapConfig =
            serde_yaml::from_str(text).map_err(|e| SigtapError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| SigtapError::io(format!("reading config {}", path.display()), e))?;
        debug!(path = %path.display(), "loaded config");
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.naming.extension.is_empty() || self.naming.extension.starts_with('.') {
            return Err(SigtapError::Config(format!(
                "extension must be non-empty and without a leading dot, got `{}`",
                self.naming.extension
            )));
        }
        if self.naming.layout_suffix.is_empty() {
            return Err(SigtapError::Config("layout_suffix must not be empty".into()));
        }
        Ok(())
    }
}
