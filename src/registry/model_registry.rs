//! Process-wide registry of trained [`ModelPair`]s with nearest-location lookup.
//!
//! The registry holds an immutable [`RegistrySnapshot`] behind a lock. Writers build a
//! complete new snapshot and swap it in, so a reader that cloned the current `Arc` keeps
//! a consistent view even while a location is being retrained.

use crate::registry::error::RegistryError;
use crate::training::trainer::ModelPair;
use crate::types::location::{KnownLocation, LatLon};
use crate::types::observation::LocationId;
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::{debug, info, warn};
use parking_lot::RwLock;
use rstar::RTree;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ARTIFACT_EXTENSION: &str = "bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    pairs: HashMap<LocationId, Arc<ModelPair>>,
    tree: RTree<KnownLocation>,
}

impl RegistrySnapshot {
    fn from_pairs(pairs: HashMap<LocationId, Arc<ModelPair>>) -> Self {
        let points = pairs
            .values()
            .map(|pair| KnownLocation {
                id: pair.location.clone(),
                coordinates: pair.coordinates,
            })
            .collect();
        Self {
            pairs,
            tree: RTree::bulk_load(points),
        }
    }

    pub fn get(&self, location: &LocationId) -> Option<Arc<ModelPair>> {
        self.pairs.get(location).cloned()
    }

    /// The trained location closest to `point` by squared distance in (lat, lon)
    /// degrees, or `None` when nothing is trained.
    pub fn nearest(&self, point: LatLon) -> Option<Arc<ModelPair>> {
        let location = self.tree.nearest_neighbor(&[point.latitude(), point.longitude()])?;
        self.get(&location.id)
    }

    pub fn locations(&self) -> BTreeSet<LocationId> {
        self.pairs.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ModelRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot. Later writes do not affect it.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.read().clone()
    }

    /// Adds or replaces the pair for its location.
    pub fn insert(&self, pair: impl Into<Arc<ModelPair>>) {
        self.insert_all(std::iter::once(pair));
    }

    /// Adds or replaces several pairs in a single swap.
    pub fn insert_all<P: Into<Arc<ModelPair>>>(&self, pairs: impl IntoIterator<Item = P>) {
        let mut current = self.current.write();
        let mut next = current.pairs.clone();
        for pair in pairs {
            let pair = pair.into();
            debug!("Registering model for '{}'", pair.location);
            next.insert(pair.location.clone(), pair);
        }
        *current = Arc::new(RegistrySnapshot::from_pairs(next));
    }

    pub fn remove(&self, location: &LocationId) -> Option<Arc<ModelPair>> {
        let mut current = self.current.write();
        let mut next = current.pairs.clone();
        let removed = next.remove(location)?;
        *current = Arc::new(RegistrySnapshot::from_pairs(next));
        Some(removed)
    }

    pub fn get(&self, location: &LocationId) -> Option<Arc<ModelPair>> {
        self.snapshot().get(location)
    }

    pub fn nearest(&self, point: LatLon) -> Option<Arc<ModelPair>> {
        self.snapshot().nearest(point)
    }

    pub fn locations(&self) -> BTreeSet<LocationId> {
        self.snapshot().locations()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Writes one bincode artifact per location into `dir`, creating it if needed.
    pub async fn save_dir(&self, dir: &Path) -> Result<usize, RegistryError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| RegistryError::DirCreation(dir.to_path_buf(), e))?;

        let snapshot = self.snapshot();
        for pair in snapshot.pairs.values() {
            let path = artifact_path(dir, &pair.location);
            let bytes = tokio::task::spawn_blocking({
                let pair = Arc::clone(pair);
                move || {
                    bincode::serde::encode_to_vec(pair.as_ref(), BINCODE_CONFIG).map_err(|e| {
                        RegistryError::ArtifactEncode(pair.location.to_string(), Box::from(e))
                    })
                }
            })
            .await??;
            tokio::fs::write(&path, &bytes)
                .await
                .map_err(|e| RegistryError::ArtifactWrite(path.clone(), e))?;
            debug!("Saved model for '{}' to {}", pair.location, path.display());
        }
        info!("Saved {} models to {}", snapshot.len(), dir.display());
        Ok(snapshot.len())
    }

    /// Loads every artifact in `dir` into the registry. A missing directory loads
    /// nothing; an unreadable or undecodable artifact fails the whole load.
    pub async fn load_dir(&self, dir: &Path) -> Result<usize, RegistryError> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Model directory {} does not exist", dir.display());
                return Ok(0);
            }
            Err(e) => return Err(RegistryError::ArtifactRead(dir.to_path_buf(), e)),
        };

        let mut pairs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RegistryError::ArtifactRead(dir.to_path_buf(), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ARTIFACT_EXTENSION) {
                continue;
            }
            let pair = tokio::task::spawn_blocking(move || read_artifact(&path)).await??;
            pairs.push(pair);
        }

        let loaded = pairs.len();
        self.insert_all(pairs);
        info!("Loaded {} models from {}", loaded, dir.display());
        Ok(loaded)
    }
}

fn read_artifact(path: &Path) -> Result<ModelPair, RegistryError> {
    let bytes = std::fs::read(path).map_err(|e| RegistryError::ArtifactRead(path.to_path_buf(), e))?;
    let (pair, _) = bincode::serde::decode_from_slice::<ModelPair, _>(&bytes, BINCODE_CONFIG)
        .map_err(|e| RegistryError::ArtifactDecode(path.to_path_buf(), Box::from(e)))?;
    Ok(pair)
}

/// `Ho Chi Minh City` is stored as `ho_chi_minh_city.bin`.
fn artifact_path(dir: &Path, location: &LocationId) -> PathBuf {
    let stem: String = location
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    dir.join(format!("{stem}.{ARTIFACT_EXTENSION}"))
}
