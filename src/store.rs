use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Read-through cache from a team name to an external identifier.
pub trait TeamLookup: Send + Sync {
    fn lookup(&self, name: &str) -> Result<Option<String>>;
    fn record(&self, name: &str, id: &str) -> Result<()>;
}

/// Stable identifier derived from the normalized name.
pub fn team_id(name: &str) -> String {
    let digest = Sha256::digest(cache_key(name).as_bytes());
    hex::encode(digest)[..16].to_string()
}

fn cache_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Default)]
pub struct NoopTeamLookup;

impl TeamLookup for NoopTeamLookup {
    fn lookup(&self, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn record(&self, _name: &str, _id: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryTeamLookup {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryTeamLookup {
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TeamLookup for MemoryTeamLookup {
    fn lookup(&self, name: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("team cache lock poisoned"))?;
        Ok(entries.get(&cache_key(name)).cloned())
    }

    fn record(&self, name: &str, id: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("team cache lock poisoned"))?;
        entries.insert(cache_key(name), id.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamCacheState {
    pub schema_version: u32,
    pub teams: BTreeMap<String, String>,
}

impl Default for TeamCacheState {
    fn default() -> Self {
        Self {
            schema_version: 1,
            teams: BTreeMap::new(),
        }
    }
}

/// JSON file on disk; every `record` rewrites the file.
#[derive(Debug)]
pub struct JsonTeamStore {
    path: PathBuf,
    state: Mutex<TeamCacheState>,
}

impl JsonTeamStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(load_state(path)?),
        })
    }
}

impl TeamLookup for JsonTeamStore {
    fn lookup(&self, name: &str) -> Result<Option<String>> {
        let state = self
            .state
            .lock()
            .map_err(|_| anyhow!("team store lock poisoned"))?;
        Ok(state.teams.get(&cache_key(name)).cloned())
    }

    fn record(&self, name: &str, id: &str) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("team store lock poisoned"))?;
        state.teams.insert(cache_key(name), id.to_string());
        save_state(&self.path, &state)
    }
}

pub fn load_state(path: &Path) -> Result<TeamCacheState> {
    if !path.exists() {
        return Ok(TeamCacheState::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read team store {}", path.display()))?;
    let state = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse team store {}", path.display()))?;
    Ok(state)
}

pub fn save_state(path: &Path, state: &TeamCacheState) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("failed to create team store directory {}", parent.display())
        })?;
    }

    let serialized = serde_json::to_string_pretty(state)?;
    std::fs::write(path, serialized)
        .with_context(|| format!("failed to write team store {}", path.display()))?;
    Ok(())
}
