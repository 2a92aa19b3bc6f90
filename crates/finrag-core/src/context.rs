//! The active ticker: which company questions are asked about.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::controller::Rejection;

/// Storage key holding the active ticker
pub const ACTIVE_TICKER_KEY: &str = "active_ticker";

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("ticker is empty")]
    EmptyTicker,

    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("state file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trim and uppercase a ticker. Returns `None` when nothing is left.
pub fn normalize_ticker(input: &str) -> Option<String> {
    let ticker = input.trim().to_uppercase();
    if ticker.is_empty() {
        None
    } else {
        Some(ticker)
    }
}

/// Opaque string key-value storage that survives restarts
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ContextError>;
    fn remove(&mut self, key: &str) -> Result<(), ContextError>;
}

/// Non-persistent store, for tests and `--ephemeral` sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ContextError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ContextError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten on every change
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store; an
    /// unreadable one is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable state file");
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn default_path() -> Result<PathBuf, ContextError> {
        let config_dir = dirs::config_dir().ok_or(ContextError::NoConfigDir)?;
        Ok(config_dir.join("finrag").join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, ContextError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn flush(&self) -> Result<(), ContextError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ContextError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), ContextError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Holds the active ticker and writes it through to storage.
pub struct ContextStore {
    store: Box<dyn KeyValueStore>,
    active: Option<String>,
}

impl ContextStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        let active = store
            .get(ACTIVE_TICKER_KEY)
            .and_then(|t| normalize_ticker(&t));
        Self { store, active }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    pub fn active_ticker(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Normalize and store `ticker`, replacing any previous value.
    ///
    /// A storage failure is logged; the new ticker still applies for the rest
    /// of the session.
    pub fn set_active_ticker(&mut self, ticker: &str) -> Result<String, ContextError> {
        let ticker = normalize_ticker(ticker).ok_or(ContextError::EmptyTicker)?;
        self.active = Some(ticker.clone());
        if let Err(e) = self.store.set(ACTIVE_TICKER_KEY, &ticker) {
            warn!(%ticker, error = %e, "failed to persist active ticker");
        }
        debug!(%ticker, "active ticker set");
        Ok(ticker)
    }

    pub fn clear_active_ticker(&mut self) {
        self.active = None;
        if let Err(e) = self.store.remove(ACTIVE_TICKER_KEY) {
            warn!(error = %e, "failed to clear persisted ticker");
        }
    }

    /// Pick the ticker a question applies to. Explicit input wins over the
    /// stored context; with neither, the question is refused.
    pub fn resolve(&self, sidebar_input: &str) -> Result<String, Rejection> {
        normalize_ticker(sidebar_input)
            .or_else(|| self.active.clone())
            .ok_or(Rejection::NoTicker)
    }
}
