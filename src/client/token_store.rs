use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

/// Storage key holding the session token.
pub const TOKEN_KEY: &str = "token";

/// Persistent home of the single session token.
pub trait TokenStore: Send + Sync {
    fn save(&self, token: &str) -> Result<(), String>;
    fn read(&self) -> Result<Option<String>, String>;
    fn clear(&self) -> Result<(), String>;
}

/// Token kept in a JSON key/value file, so it survives restarts for the
/// same profile. Other keys in the file are preserved.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| format!("Corrupt storage file {}: {}", self.path.display(), e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(format!("Failed to read {}: {}", self.path.display(), e)),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
        let raw = serde_json::to_string_pretty(entries).map_err(|e| e.to_string())?;
        fs::write(&self.path, raw)
            .map_err(|e| format!("Failed to write {}: {}", self.path.display(), e))
    }
}

impl TokenStore for FileTokenStore {
    fn save(&self, token: &str) -> Result<(), String> {
        let mut entries = self.load()?;
        entries.insert(TOKEN_KEY.to_string(), token.to_string());
        self.persist(&entries)?;
        debug!("Saved session token to {}", self.path.display());
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, String> {
        Ok(self.load()?.remove(TOKEN_KEY))
    }

    fn clear(&self) -> Result<(), String> {
        let mut entries = self.load()?;
        if entries.remove(TOKEN_KEY).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

/// Token kept only for the lifetime of the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, token: &str) -> Result<(), String> {
        *self.token.lock().map_err(|e| e.to_string())? = Some(token.to_string());
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, String> {
        Ok(self.token.lock().map_err(|e| e.to_string())?.clone())
    }

    fn clear(&self) -> Result<(), String> {
        *self.token.lock().map_err(|e| e.to_string())? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file() -> PathBuf {
        std::env::temp_dir()
            .join(format!("donation-tracker-{}", uuid::Uuid::new_v4()))
            .join("storage.json")
    }

    #[test]
    fn file_store_survives_reopening() {
        let path = scratch_file();
        FileTokenStore::new(&path).save("abc").unwrap();

        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.read().unwrap().as_deref(), Some("abc"));

        reopened.clear().unwrap();
        assert_eq!(FileTokenStore::new(&path).read().unwrap(), None);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn file_store_keeps_unrelated_keys() {
        let path = scratch_file();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let store = FileTokenStore::new(&path);
        store.save("abc").unwrap();
        store.clear().unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("theme"));
        assert!(!raw.contains("abc"));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_file_reads_as_absent() {
        assert_eq!(FileTokenStore::new(scratch_file()).read().unwrap(), None);
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.read().unwrap(), None);
        store.save("t1").unwrap();
        store.save("t2").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("t2"));
        store.clear().unwrap();
        assert_eq!(store.read().unwrap(), None);
    }
}
