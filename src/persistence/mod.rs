//! Key-value persistence port
//!
//! Progress and settings are small JSON strings stored under fixed keys.
//! - `MemoryStore`: tests and hosts without storage
//! - `FileStore`: one file per key in a directory, written via tmp + rename (native)
//! - `LocalStorage`: browser LocalStorage (wasm32)

use std::collections::HashMap;

use thiserror::Error;

/// Storage failures. Callers treat all of these as "nothing stored".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String key-value storage
pub trait KeyValueStore {
    /// Stored value, or `None` if the key was never written
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use std::fs;
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    use super::{KeyValueStore, StoreError};

    /// Directory of `<key>.json` files
    #[derive(Debug, Clone)]
    pub struct FileStore {
        dir: PathBuf,
    }

    impl FileStore {
        /// Open (and create if needed) a store rooted at `dir`
        pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
            let dir = dir.as_ref().to_path_buf();
            fs::create_dir_all(&dir)?;
            Ok(Self { dir })
        }

        fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
            let valid = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !valid {
                return Err(StoreError::Unavailable(format!("invalid key {key:?}")));
            }
            Ok(self.dir.join(format!("{key}.json")))
        }
    }

    impl KeyValueStore for FileStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            match fs::read_to_string(self.path_for(key)?) {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            let path = self.path_for(key)?;
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, value)?;
            fs::rename(&tmp, &path)?;
            Ok(())
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            match fs::remove_file(self.path_for(key)?) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::LocalStorage;

#[cfg(target_arch = "wasm32")]
mod web {
    use super::{KeyValueStore, StoreError};

    /// Browser LocalStorage
    pub struct LocalStorage {
        storage: web_sys::Storage,
    }

    impl LocalStorage {
        pub fn open() -> Result<Self, StoreError> {
            let storage = web_sys::window()
                .and_then(|w| w.local_storage().ok())
                .flatten()
                .ok_or_else(|| StoreError::Unavailable("no LocalStorage".into()))?;
            Ok(Self { storage })
        }
    }

    fn js_err(e: wasm_bindgen::JsValue) -> StoreError {
        StoreError::Unavailable(format!("{e:?}"))
    }

    impl KeyValueStore for LocalStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.storage.get_item(key).map_err(js_err)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.storage.set_item(key, value).map_err(js_err)
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            self.storage.remove_item(key).map_err(js_err)
        }
    }
}
