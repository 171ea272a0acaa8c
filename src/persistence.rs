use {
    crate::pipeline::{types::WindowEntry, windows::TopicWindow},
    serde::{Deserialize, Serialize},
    std::{
        collections::HashMap,
        fs,
        path::{Path, PathBuf},
    },
};

#[derive(Debug)]
pub enum PersistenceError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io(err)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err)
    }
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::Io(e) => write!(f, "IO error: {}", e),
            PersistenceError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for PersistenceError {}

/// Snapshot of engine state for persistence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub windows: HashMap<String, Vec<WindowEntry>>,
    #[serde(default)]
    pub name_cache: HashMap<String, String>,
}

impl PersistedState {
    pub fn into_windows(self) -> (HashMap<String, TopicWindow>, HashMap<String, String>) {
        let windows = self
            .windows
            .into_iter()
            .map(|(topic, entries)| (topic, TopicWindow::from_entries(entries)))
            .collect();
        (windows, self.name_cache)
    }
}

/// Durable storage for windows and the name cache
pub trait StateStore: Send {
    /// Empty state when nothing was stored yet; error only for unreadable data
    fn load(&self) -> Result<PersistedState, PersistenceError>;

    fn save(&self, state: &PersistedState) -> Result<(), PersistenceError>;
}

/// JSON file store, written via a temp file and rename
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<PersistedState, PersistenceError> {
        if !self.path.exists() {
            log::info!("No existing data file found at {}, starting fresh", self.path.display());
            return Ok(PersistedState::default());
        }

        let json = fs::read_to_string(&self.path)?;
        let state: PersistedState = serde_json::from_str(&json)?;

        log::info!(
            "Loaded {} topic windows and {} cached names from {}",
            state.windows.len(),
            state.name_cache.len(),
            self.path.display()
        );
        Ok(state)
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string(state)?;
        let tmp = self.temp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}
