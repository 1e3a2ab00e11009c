//! Whole-snapshot persistence for the five fleet collections.
//!
//! Every save rewrites every collection file. There is no journaling: a crash
//! in the middle of a save can leave a file truncated.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::container::Container;
use crate::port::Port;
use crate::trip::Trip;
use crate::user::User;
use crate::vehicle::Vehicle;

pub const USERS_FILE: &str = "users.json";
pub const PORTS_FILE: &str = "ports.json";
pub const VEHICLES_FILE: &str = "vehicles.json";
pub const CONTAINERS_FILE: &str = "containers.json";
pub const TRIPS_FILE: &str = "trips.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),
}

/// Where a stored container lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerLocation {
    Port(String),
    Vehicle(String),
}

/// A container record in the containers collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredContainer {
    #[serde(flatten)]
    pub container: Container,
    pub location: ContainerLocation,
}

/// The five collections as they are persisted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub ports: Vec<Port>,
    pub vehicles: Vec<Vehicle>,
    pub containers: Vec<StoredContainer>,
    pub trips: Vec<Trip>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.ports.is_empty()
            && self.vehicles.is_empty()
            && self.containers.is_empty()
            && self.trips.is_empty()
    }
}

/// Loads and saves whole snapshots. Implementations overwrite everything on save.
pub trait SnapshotStore {
    fn load(&self) -> Result<Snapshot, StoreError>;
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// One pretty-printed JSON file per collection inside a data directory
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Missing files load as empty collections
    fn load_collection<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StoreError> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| StoreError::Json { path, source })
    }

    fn save_collection<T: Serialize>(&self, file: &str, items: &[T]) -> Result<(), StoreError> {
        let path = self.dir.join(file);
        let text = serde_json::to_string_pretty(items).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, text).map_err(|source| StoreError::Io { path, source })
    }
}

impl SnapshotStore for JsonDirStore {
    fn load(&self) -> Result<Snapshot, StoreError> {
        let snapshot = Snapshot {
            users: self.load_collection(USERS_FILE)?,
            ports: self.load_collection(PORTS_FILE)?,
            vehicles: self.load_collection(VEHICLES_FILE)?,
            containers: self.load_collection(CONTAINERS_FILE)?,
            trips: self.load_collection(TRIPS_FILE)?,
        };
        tracing::debug!(
            dir = %self.dir.display(),
            users = snapshot.users.len(),
            ports = snapshot.ports.len(),
            vehicles = snapshot.vehicles.len(),
            containers = snapshot.containers.len(),
            trips = snapshot.trips.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.save_collection(USERS_FILE, &snapshot.users)?;
        self.save_collection(PORTS_FILE, &snapshot.ports)?;
        self.save_collection(VEHICLES_FILE, &snapshot.vehicles)?;
        self.save_collection(CONTAINERS_FILE, &snapshot.containers)?;
        self.save_collection(TRIPS_FILE, &snapshot.trips)?;
        tracing::debug!(dir = %self.dir.display(), "saved snapshot");
        Ok(())
    }
}

/// Keeps the last saved snapshot in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Snapshot,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self { snapshot, saves: 0 }
    }

    /// Number of saves since creation
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Snapshot, StoreError> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.snapshot = snapshot.clone();
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerType;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_empty());

        let snapshot = Snapshot {
            users: vec![User::admin("admin", "admin123")],
            ..Snapshot::default()
        };
        store.save(&snapshot).unwrap();
        assert_eq!(store.saves(), 1);
        assert_eq!(store.load().unwrap().users.len(), 1);
    }

    #[test]
    fn test_stored_container_json_shape() {
        let record = StoredContainer {
            container: Container::new("C1", 1200.0, ContainerType::Liquid),
            location: ContainerLocation::Vehicle("T1".to_string()),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "C1");
        assert_eq!(json["weight"], 1200.0);
        assert_eq!(json["kind"], "Liquid");
        assert_eq!(json["location"]["Vehicle"], "T1");

        let back: StoredContainer = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
