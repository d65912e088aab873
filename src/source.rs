// src/source.rs

use glob::{glob, Pattern};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufRead, BufReader, Cursor},
    path::{Path, PathBuf},
};
use tracing::trace;

use crate::error::{Result, SigtapError};

/// A directory-like collection of named entries (layout and data files).
pub trait DirectorySource {
    /// Human-readable location, used in error messages.
    fn describe(&self) -> String;

    /// Entry names whose file name matches the glob `pattern`, sorted.
    fn list(&self, pattern: &str) -> Result<Vec<String>>;

    /// Open `entry` for reading. The reader is dropped by the caller once done.
    fn open(&self, entry: &str) -> io::Result<Box<dyn BufRead + '_>>;
}

/// Entries are the regular files directly inside `root`.
#[derive(Debug, Clone)]
pub struct FsDirectory {
    root: PathBuf,
}

impl FsDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DirectorySource for FsDirectory {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn list(&self, pattern: &str) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(SigtapError::io(
                format!("listing {}", self.root.display()),
                io::Error::new(io::ErrorKind::NotFound, "not a directory"),
            ));
        }
        let escaped = Pattern::escape(&self.root.to_string_lossy());
        let full = format!("{}/{}", escaped, pattern);
        let paths = glob(&full).map_err(|e| {
            SigtapError::io(
                format!("bad pattern `{}`", pattern),
                io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
            )
        })?;

        let mut names = Vec::new();
        for entry in paths {
            let path = entry.map_err(|e| {
                SigtapError::io(format!("listing {}", self.root.display()), e.into_error())
            })?;
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        trace!(root = %self.root.display(), pattern, found = names.len(), "listed entries");
        Ok(names)
    }

    fn open(&self, entry: &str) -> io::Result<Box<dyn BufRead + '_>> {
        let file = File::open(self.root.join(entry))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// In-memory entries, mostly for tests and for callers that already hold the bytes.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(name, contents);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.entries.insert(name.into(), contents.into());
    }
}

impl DirectorySource for MemoryDirectory {
    fn describe(&self) -> String {
        "<memory>".to_string()
    }

    fn list(&self, pattern: &str) -> Result<Vec<String>> {
        let pat = Pattern::new(pattern).map_err(|e| {
            SigtapError::io(
                format!("bad pattern `{}`", pattern),
                io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
            )
        })?;
        Ok(self
            .entries
            .keys()
            .filter(|name| pat.matches(name))
            .cloned()
            .collect())
    }

    fn open(&self, entry: &str) -> io::Result<Box<dyn BufRead + '_>> {
        match self.entries.get(entry) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no entry `{}`", entry),
            )),
        }
    }
}
