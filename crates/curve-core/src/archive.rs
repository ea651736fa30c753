//! Access to the entries of a document container.

use crate::error::{DecodeError, Result};
use anyhow::{anyhow, bail, Context};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};
use zip::result::ZipError;
use zip::ZipArchive;

/// Entry names that hold a complete document archive of their own.
const NESTED_ARCHIVE_SUFFIXES: &[&str] = &[".curve", ".vectornator", ".zip"];

/// Largest buffer reserved up front from an entry's declared size.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Initial buffer size for an entry. Zip headers are untrusted, so the declared
/// size is only a hint and the buffer grows past it while reading.
fn capacity_hint(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOCATION)).unwrap_or(0)
}

/// Reads named entries out of a document container.
pub trait ArchiveAccessor: Send + Sync {
    fn read_bytes(&self, path: &str) -> anyhow::Result<Vec<u8>>;

    fn contains(&self, path: &str) -> bool {
        self.read_bytes(path).is_ok()
    }

    fn read_json(&self, path: &str) -> Result<Value> {
        let bytes = self
            .read_bytes(path)
            .map_err(|source| DecodeError::Archive {
                path: path.to_string(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| DecodeError::Json {
            path: path.to_string(),
            source,
        })
    }

    /// Entry contents as standard base64, for embedding bitmaps.
    fn read_base64(&self, path: &str) -> Result<String> {
        let bytes = self
            .read_bytes(path)
            .map_err(|source| DecodeError::Archive {
                path: path.to_string(),
                source,
            })?;
        Ok(BASE64_STANDARD.encode(bytes))
    }
}

/// Zip-backed container.
///
/// Lookups fall back to archives stored inside the archive: `"inner.curve/Manifest.json"`
/// addresses an entry of the nested `inner.curve`, and a bare name that is missing at the
/// top level is searched for in every nested `.curve`, `.vectornator` or `.zip` entry.
pub struct ZipArchiveReader<R> {
    archive: Mutex<ZipArchive<R>>,
}

impl ZipArchiveReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl ZipArchiveReader<Cursor<Vec<u8>>> {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::new(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> ZipArchiveReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        Ok(Self {
            archive: Mutex::new(archive),
        })
    }

    pub fn entry_names(&self) -> Vec<String> {
        match self.archive.lock() {
            Ok(archive) => archive.file_names().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Open an archive stored as an entry of this one.
    pub fn nested(&self, entry: &str) -> Result<ZipArchiveReader<Cursor<Vec<u8>>>> {
        let bytes = self
            .read_entry(entry)
            .map_err(|source| DecodeError::Archive {
                path: entry.to_string(),
                source,
            })?
            .ok_or_else(|| DecodeError::EntryNotFound(entry.to_string()))?;
        ZipArchiveReader::from_bytes(bytes)
    }

    fn read_entry(&self, name: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let mut archive = self
            .archive
            .lock()
            .map_err(|_| anyhow!("archive lock poisoned"))?;
        let mut file = match archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut buf = Vec::with_capacity(capacity_hint(file.size()));
        file.read_to_end(&mut buf)
            .with_context(|| format!("reading '{}'", name))?;
        Ok(Some(buf))
    }
}

impl<R: Read + Seek + Send> ArchiveAccessor for ZipArchiveReader<R> {
    #[instrument(level = "debug", skip(self), fields(path = path))]
    fn read_bytes(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        if let Some(bytes) = self.read_entry(path)? {
            return Ok(bytes);
        }

        // "outer/inner" where "outer" is itself an archive entry.
        for (i, _) in path.match_indices('/') {
            let (outer, inner) = (&path[..i], &path[i + 1..]);
            if let Some(bytes) = self.read_entry(outer)? {
                debug!("Descending into nested archive '{}'", outer);
                return ZipArchiveReader::from_bytes(bytes)?.read_bytes(inner);
            }
        }

        let nested: Vec<String> = self
            .entry_names()
            .into_iter()
            .filter(|name| NESTED_ARCHIVE_SUFFIXES.iter().any(|s| name.ends_with(s)))
            .collect();
        for name in nested {
            let Some(bytes) = self.read_entry(&name)? else {
                continue;
            };
            let Ok(inner) = ZipArchiveReader::from_bytes(bytes) else {
                continue;
            };
            if let Some(found) = inner.read_entry(path)? {
                debug!("Found '{}' inside nested archive '{}'", path, name);
                return Ok(found);
            }
        }

        bail!("entry '{}' not found in archive", path)
    }
}

/// Container whose entries are already in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryArchive {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(path.into(), bytes.into());
    }

    pub fn insert_json(&mut self, path: impl Into<String>, value: &Value) {
        self.insert(path, value.to_string());
    }

    pub fn with_json(mut self, path: impl Into<String>, value: &Value) -> Self {
        self.insert_json(path, value);
        self
    }

    pub fn with_entry(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl ArchiveAccessor for MemoryArchive {
    fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    fn read_bytes(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("entry '{}' not found in archive", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_read_json_from_simple_zip() {
        let bytes = zip_bytes(&[("test.json", br#"{"key": "value"}"#)]);
        let archive = ZipArchiveReader::from_bytes(bytes).unwrap();
        assert_eq!(archive.read_json("test.json").unwrap(), json!({"key": "value"}));
    }

    #[test]
    fn test_read_json_from_nested_zip() {
        let inner = zip_bytes(&[("nested.json", br#"{"nested": "data"}"#)]);
        let outer = zip_bytes(&[("inner.curve", &inner)]);
        let archive = ZipArchiveReader::from_bytes(outer).unwrap();

        assert_eq!(
            archive.read_json("nested.json").unwrap(),
            json!({"nested": "data"})
        );
        assert_eq!(
            archive.read_json("inner.curve/nested.json").unwrap(),
            json!({"nested": "data"})
        );
        let nested = archive.nested("inner.curve").unwrap();
        assert_eq!(nested.entry_names(), vec!["nested.json".to_string()]);
    }

    #[test]
    fn test_missing_entry() {
        let bytes = zip_bytes(&[("a.json", b"{}")]);
        let archive = ZipArchiveReader::from_bytes(bytes).unwrap();
        let err = archive.read_json("b.json").unwrap_err();
        assert!(matches!(err, DecodeError::Archive { ref path, .. } if path == "b.json"));
    }

    #[test]
    fn test_invalid_json() {
        let archive = MemoryArchive::new().with_entry("bad.json", "{not json");
        let err = archive.read_json("bad.json").unwrap_err();
        assert!(matches!(err, DecodeError::Json { .. }));
    }

    #[test]
    fn test_declared_size_only_caps_the_hint() {
        assert_eq!(capacity_hint(0), 0);
        assert_eq!(capacity_hint(1024), 1024);
        assert_eq!(capacity_hint(u64::MAX), MAX_PREALLOCATION as usize);
    }

    #[test]
    fn test_base64() {
        let archive = MemoryArchive::new().with_entry("image.dat", vec![0u8, 1, 2, 3]);
        assert!(archive.contains("image.dat"));
        assert!(!archive.contains("other.dat"));
        assert_eq!(archive.read_base64("image.dat").unwrap(), "AAECAw==");
    }
}
