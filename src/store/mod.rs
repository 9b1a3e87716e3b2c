//! Model Store - persistence boundary
//!
//! One JSON document per logical store: network weights, aggregate
//! model state and trade history, each independently loadable. Loading
//! merges onto hard-coded defaults (`#[serde(default)]` on every grown
//! field), so adding a field never requires a data migration.
//!
//! The port is a plain trait so tests run against the in-memory
//! implementation with no real I/O. Missing documents load as `None`;
//! corrupt documents surface an error that the engine downgrades to a
//! warning plus fresh defaults.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

use crate::lifecycle::TradeRecord;
use crate::model::ModelState;
use crate::network::NetworkState;

const NETWORK_DOC: &str = "network_state.json";
const MODEL_DOC: &str = "model_state.json";
const TRADES_DOC: &str = "trade_history.json";

/// Persistence port for the learning core.
pub trait ModelStore {
    fn load_network(&self) -> Result<Option<NetworkState>>;
    fn load_model(&self) -> Result<Option<ModelState>>;
    fn load_trades(&self) -> Result<Option<Vec<TradeRecord>>>;

    fn save_network(&self, network: &NetworkState) -> Result<()>;
    fn save_model(&self, model: &ModelState) -> Result<()>;
    fn save_trades(&self, trades: &[TradeRecord]) -> Result<()>;
}

/// File-backed store: one pretty-printed JSON file per document under
/// a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating store directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn read_doc<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let value: T = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(value))
    }

    fn write_doc<T: serde::Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

impl ModelStore for FileStore {
    fn load_network(&self) -> Result<Option<NetworkState>> {
        self.read_doc(NETWORK_DOC)
    }

    fn load_model(&self) -> Result<Option<ModelState>> {
        self.read_doc(MODEL_DOC)
    }

    fn load_trades(&self) -> Result<Option<Vec<TradeRecord>>> {
        self.read_doc(TRADES_DOC)
    }

    fn save_network(&self, network: &NetworkState) -> Result<()> {
        self.write_doc(NETWORK_DOC, network)?;
        info!(path = %self.dir.join(NETWORK_DOC).display(), "network state saved");
        Ok(())
    }

    fn save_model(&self, model: &ModelState) -> Result<()> {
        self.write_doc(MODEL_DOC, model)
    }

    fn save_trades(&self, trades: &[TradeRecord]) -> Result<()> {
        self.write_doc(TRADES_DOC, &trades)
    }
}

/// In-memory store holding the serialized documents, for tests and
/// ephemeral deployments. Round-trips through JSON exactly like the
/// file store so schema problems show up in unit tests.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<&'static str, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_doc<T: serde::de::DeserializeOwned>(&self, name: &'static str) -> Result<Option<T>> {
        let docs = self.docs.lock().expect("store lock poisoned");
        match docs.get(name) {
            Some(raw) => {
                let value: T =
                    serde_json::from_str(raw).with_context(|| format!("parsing doc {name}"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn write_doc<T: serde::Serialize>(&self, name: &'static str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.docs
            .lock()
            .expect("store lock poisoned")
            .insert(name, json);
        Ok(())
    }

    /// Corrupt a document on purpose (test hook for the degraded-load
    /// path).
    pub fn poison(&self, name: &'static str) {
        self.docs
            .lock()
            .expect("store lock poisoned")
            .insert(name, "{not valid json".to_string());
    }
}

impl ModelStore for MemoryStore {
    fn load_network(&self) -> Result<Option<NetworkState>> {
        self.read_doc(NETWORK_DOC)
    }

    fn load_model(&self) -> Result<Option<ModelState>> {
        self.read_doc(MODEL_DOC)
    }

    fn load_trades(&self) -> Result<Option<Vec<TradeRecord>>> {
        self.read_doc(TRADES_DOC)
    }

    fn save_network(&self, network: &NetworkState) -> Result<()> {
        self.write_doc(NETWORK_DOC, network)
    }

    fn save_model(&self, model: &ModelState) -> Result<()> {
        self.write_doc(MODEL_DOC, model)
    }

    fn save_trades(&self, trades: &[TradeRecord]) -> Result<()> {
        self.write_doc(TRADES_DOC, &trades)
    }
}

/// Document names, exposed for tests.
pub mod docs {
    pub const NETWORK: &str = super::NETWORK_DOC;
    pub const MODEL: &str = super::MODEL_DOC;
    pub const TRADES: &str = super::TRADES_DOC;
}
