use std::{
    collections::BTreeMap,
    ffi::OsString,
    fmt, fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use exn::ResultExt;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// Errors returned by [`Store`] operations.
#[derive(Debug)]
pub struct Error(pub(crate) String);

impl Error {
    /// Build an error for a [`Store`] implemented outside this crate.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Error {}

/// A single namespace of string keys mapped to JSON values.
///
/// Every call is a synchronous round trip to the backing storage. Nothing
/// here serializes concurrent read-modify-write cycles; callers sharing one
/// store across processes can lose updates.
pub trait Store {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> exn::Result<Option<Value>, Error>;

    /// Replace the value stored under `key`.
    fn put(&self, key: &str, value: Value) -> exn::Result<(), Error>;

    /// Whether anything is stored under `key`.
    fn contains(&self, key: &str) -> exn::Result<bool, Error>;
}

/// Typed access on top of [`Store`].
pub trait StoreExt: Store {
    /// Read and deserialize `key`, falling back to `default` when absent.
    ///
    /// A value that is present but does not decode as `T` is an error.
    fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> exn::Result<T, Error> {
        match self.get(key)? {
            Some(value) => serde_json::from_value(value)
                .or_raise(|| Error(format!("decode value for key {key}"))),
            None => Ok(default),
        }
    }

    /// Serialize `value` and store it under `key`.
    fn put_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> exn::Result<(), Error> {
        let value = serde_json::to_value(value)
            .or_raise(|| Error(format!("encode value for key {key}")))?;
        self.put(key, value)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// In-process store. Contents are lost when dropped.
///
/// Operations panic if the internal mutex is poisoned.
#[derive(Debug, Default)]
pub struct Memory {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl Memory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for Memory {
    fn get(&self, key: &str) -> exn::Result<Option<Value>, Error> {
        Ok(self.entries.lock().expect("poisoned").get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> exn::Result<(), Error> {
        self.entries
            .lock()
            .expect("poisoned")
            .insert(key.to_owned(), value);
        tracing::debug!(key, "memory put");
        Ok(())
    }

    fn contains(&self, key: &str) -> exn::Result<bool, Error> {
        Ok(self.entries.lock().expect("poisoned").contains_key(key))
    }
}

// ---------------------------------------------------------------------------
// JsonFile
// ---------------------------------------------------------------------------

/// Store backed by one JSON object document on disk.
///
/// The document is re-read on every access so that each message sees the
/// latest persisted state. Writes go to a sibling temp file that is then
/// renamed over the document. A missing or blank file reads as empty.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> exn::Result<Map<String, Value>, Error> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let bytes = fs::read(&self.path)
            .or_raise(|| Error(format!("read store {}", self.path.display())))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        serde_json::from_slice(&bytes)
            .or_raise(|| Error(format!("parse store {}", self.path.display())))
    }

    fn write(&self, data: &Map<String, Value>) -> exn::Result<(), Error> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .or_raise(|| Error(format!("create store dir {}", dir.display())))?;
        }
        let tmp = temp_path(&self.path);
        let written = self.write_through(&tmp, data);
        if written.is_err() {
            if let Err(err) = fs::remove_file(&tmp) {
                tracing::debug!(path = %tmp.display(), %err, "temp file not removed");
            }
        }
        written
    }

    fn write_through(&self, tmp: &Path, data: &Map<String, Value>) -> exn::Result<(), Error> {
        let mut file = fs::File::create(tmp)
            .or_raise(|| Error(format!("create {}", tmp.display())))?;
        serde_json::to_writer_pretty(&mut file, data)
            .or_raise(|| Error(format!("encode store {}", tmp.display())))?;
        file.write_all(b"\n")
            .or_raise(|| Error(format!("write {}", tmp.display())))?;
        file.sync_all()
            .or_raise(|| Error(format!("sync {}", tmp.display())))?;
        drop(file);
        fs::rename(tmp, &self.path).or_raise(|| {
            Error(format!(
                "rename {} to {}",
                tmp.display(),
                self.path.display()
            ))
        })?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl Store for JsonFile {
    fn get(&self, key: &str) -> exn::Result<Option<Value>, Error> {
        let mut data = self.read()?;
        tracing::trace!(key, path = %self.path.display(), "store get");
        Ok(data.remove(key))
    }

    fn put(&self, key: &str, value: Value) -> exn::Result<(), Error> {
        let mut data = self.read()?;
        data.insert(key.to_owned(), value);
        self.write(&data)?;
        tracing::debug!(key, path = %self.path.display(), "store put");
        Ok(())
    }

    fn contains(&self, key: &str) -> exn::Result<bool, Error> {
        Ok(self.read()?.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn memory_get_put_contains() {
        let store = Memory::new();
        assert!(!store.contains("limit").unwrap());
        assert_eq!(store.get("limit").unwrap(), None);

        store.put("limit", json!(["alice"])).unwrap();
        assert!(store.contains("limit").unwrap());
        assert_eq!(store.get("limit").unwrap(), Some(json!(["alice"])));
    }

    #[test]
    fn get_or_falls_back_to_default() {
        let store = Memory::new();
        let limit: Vec<String> = store.get_or("limit", Vec::new()).unwrap();
        assert!(limit.is_empty());

        store.put_as("limit", &["bob", "carol"]).unwrap();
        let limit: Vec<String> = store.get_or("limit", Vec::new()).unwrap();
        assert_eq!(limit, vec!["bob", "carol"]);
    }

    #[test]
    fn get_or_rejects_mismatched_value() {
        let store = Memory::new();
        store.put("limit", json!({"not": "a list"})).unwrap();
        assert!(store.get_or::<Vec<String>>("limit", Vec::new()).is_err());
    }

    #[test]
    fn json_file_missing_reads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFile::new(dir.path().join("absent.json"));
        assert!(!store.contains("mapping").unwrap());
        assert_eq!(store.get("mapping").unwrap(), None);
    }

    #[test]
    fn json_file_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("store.json");

        JsonFile::new(&path).put("limit", json!(["alice"])).unwrap();
        JsonFile::new(&path)
            .put("mapping", json!({"rust": ["alice"]}))
            .unwrap();

        let reopened = JsonFile::new(&path);
        assert_eq!(reopened.get("limit").unwrap(), Some(json!(["alice"])));
        assert_eq!(
            reopened.get("mapping").unwrap(),
            Some(json!({"rust": ["alice"]}))
        );
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn json_file_blank_reads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        fs::write(&path, "\n").unwrap();
        assert_eq!(JsonFile::new(&path).get("limit").unwrap(), None);
    }

    #[test]
    fn json_file_corrupt_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        fs::write(&path, "[1, 2").unwrap();
        let store = JsonFile::new(&path);
        assert!(store.get("limit").is_err());
        assert!(store.put("limit", json!([])).is_err());
    }

    #[test]
    fn json_file_failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A non-empty directory in place of the document makes the rename fail.
        let path = dir.path().join("store.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "").unwrap();

        let store = JsonFile::new(&path);
        assert!(store.write(&Map::new()).is_err());
        assert!(!temp_path(&path).exists());
    }
}
