use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::listing::error_content::percent_encode_component;
use crate::pages::PageSize;

/// Page position remembered for a named view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPreferences {
    pub page_index: usize,
    pub page_size: PageSize,
}

/// Durable slot for view preferences. Loading never fails: missing or corrupt
/// data reads as `None`. Saving is fire-and-forget.
pub trait PreferencesStore {
    fn load(&self, key: &str) -> Option<ViewPreferences>;
    fn save(&self, key: &str, prefs: &ViewPreferences);
}

impl<S: PreferencesStore + ?Sized> PreferencesStore for &S {
    fn load(&self, key: &str) -> Option<ViewPreferences> {
        (**self).load(key)
    }

    fn save(&self, key: &str, prefs: &ViewPreferences) {
        (**self).save(key, prefs)
    }
}

/// One JSON file per view under a directory.
#[derive(Clone, Debug)]
pub struct FilePreferencesStore {
    dir: PathBuf,
}

impl FilePreferencesStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

// Percent-encodes the key so distinct view names never share a file. Dots are
// encoded too, which keeps `.` and `..` out of the directory.
fn file_stem(key: &str) -> String {
    if key.is_empty() {
        return "%".to_string();
    }
    percent_encode_component(key).replace('.', "%2E")
}

impl PreferencesStore for FilePreferencesStore {
    fn load(&self, key: &str) -> Option<ViewPreferences> {
        let path = self.path_for(key);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), "failed to read view preferences: {e}");
                return None;
            }
        };
        match serde_json::from_str::<ViewPreferences>(&contents) {
            Ok(prefs) => Some(prefs),
            Err(e) => {
                warn!(path = %path.display(), "malformed view preferences, using defaults: {e}");
                None
            }
        }
    }

    fn save(&self, key: &str, prefs: &ViewPreferences) {
        let path = self.path_for(key);
        let contents = match serde_json::to_string(prefs) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("failed to encode view preferences for '{key}': {e}");
                return;
            }
        };
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), "failed to create preferences directory: {e}");
            return;
        }
        match std::fs::write(&path, contents) {
            Ok(()) => debug!(path = %path.display(), "stored view preferences"),
            Err(e) => warn!(path = %path.display(), "failed to store view preferences: {e}"),
        }
    }
}

/// In-process store; clones share the same slots.
#[derive(Clone, Debug, Default)]
pub struct MemoryPreferencesStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryPreferencesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes raw contents into a slot, bypassing encoding.
    pub fn put_raw(&self, key: &str, raw: &str) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.insert(key.to_string(), raw.to_string());
        }
    }

    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.slots.lock().ok()?.get(key).cloned()
    }
}

impl PreferencesStore for MemoryPreferencesStore {
    fn load(&self, key: &str) -> Option<ViewPreferences> {
        let raw = self.get_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(prefs) => Some(prefs),
            Err(e) => {
                warn!("malformed view preferences for '{key}', using defaults: {e}");
                None
            }
        }
    }

    fn save(&self, key: &str, prefs: &ViewPreferences) {
        match serde_json::to_string(prefs) {
            Ok(raw) => self.put_raw(key, &raw),
            Err(e) => warn!("failed to encode view preferences for '{key}': {e}"),
        }
    }
}
