//! Persistence for conversation state

use super::state::ConversationState;
use crate::utils::safe_filename;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Durable storage for session actors, keyed by agent id
pub trait StateStore: Send + Sync {
    /// Load the persisted state for `id`, if any
    fn load(&self, id: &str) -> crate::Result<Option<ConversationState>>;

    /// Persist the state for `id`, replacing any previous value
    fn save(&self, id: &str, state: &ConversationState) -> crate::Result<()>;
}

/// Stores each session as a JSON file in a directory
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn state_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", safe_filename(id)))
    }
}

impl StateStore for FileStateStore {
    fn load(&self, id: &str) -> crate::Result<Option<ConversationState>> {
        let path = self.state_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let state = serde_json::from_str(&content).map_err(|e| {
            crate::Error::Session(format!("corrupt state file {}: {}", path.display(), e))
        })?;
        Ok(Some(state))
    }

    fn save(&self, id: &str, state: &ConversationState) -> crate::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(self.state_path(id), content)?;
        Ok(())
    }
}

/// Keeps session state in process memory only
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<String, ConversationState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, id: &str) -> crate::Result<Option<ConversationState>> {
        Ok(self.states.lock().get(id).cloned())
    }

    fn save(&self, id: &str, state: &ConversationState) -> crate::Result<()> {
        self.states.lock().insert(id.to_string(), state.clone());
        Ok(())
    }
}
