//! Model Store
//!
//! Persists each trained model as a pair of JSON files:
//!
//! ```text
//! <models_dir>/<name>.model.json     forest + metadata
//! <models_dir>/<name>_scaler.json    scaler statistics
//! ```
//!
//! Both files carry the `training_id` of the run that produced them; a load
//! that finds two different ids reports `PairMismatch` instead of silently
//! combining a scaler with a forest it was never trained with.
//!
//! Each name has its own `RwLock`: saves are exclusive, loads are shared, so
//! a reader sees either the old or the new complete pair. Loaded artifacts
//! are cached per name and replaced atomically on save. A cached artifact is
//! served only while the scaler on disk still carries its `training_id`, so a
//! pair replaced by another store or process is picked up on the next load.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::validation::is_valid_model_name;
use crate::ml_engine::forest::RandomForest;
use crate::ml_engine::scaler::ScalerState;
use crate::types::ServiceError;

use super::StorageError;

const MODEL_SUFFIX: &str = ".model.json";
const SCALER_SUFFIX: &str = "_scaler.json";

/// A trained forest together with the scaler it expects.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub name: String,
    pub training_id: String,
    pub trained_at: DateTime<Utc>,
    /// Held-out R² recorded at training time
    pub score: f64,
    pub forest: RandomForest,
    pub scaler: ScalerState,
}

#[derive(Serialize, Deserialize)]
struct ModelFile {
    training_id: String,
    name: String,
    trained_at: DateTime<Utc>,
    score: f64,
    forest: RandomForest,
}

#[derive(Serialize, Deserialize)]
struct ScalerFile {
    training_id: String,
    scaler: ScalerState,
}

#[derive(Default)]
struct ModelSlot {
    lock: RwLock<()>,
    cached: ArcSwapOption<ModelArtifact>,
}

pub struct ModelStore {
    dir: PathBuf,
    slots: Mutex<HashMap<String, Arc<ModelSlot>>>,
}

impl ModelStore {
    /// Store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}{MODEL_SUFFIX}"))
    }

    pub fn scaler_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}{SCALER_SUFFIX}"))
    }

    /// Persist an artifact pair, replacing any previous pair of that name.
    ///
    /// Both files are written to temporaries first, then renamed scaler
    /// first, model second, under the name's write lock.
    pub fn save(&self, artifact: ModelArtifact) -> Result<Arc<ModelArtifact>, ServiceError> {
        check_name(&artifact.name)?;
        let slot = self.slot(&artifact.name)?;
        let _guard = slot
            .lock
            .write()
            .map_err(|_| ServiceError::Internal(format!("model lock poisoned: {}", artifact.name)))?;

        fs::create_dir_all(&self.dir).map_err(StorageError::from)?;

        let scaler_json = serde_json::to_vec(&ScalerFile {
            training_id: artifact.training_id.clone(),
            scaler: artifact.scaler.clone(),
        })
        .map_err(StorageError::from)?;
        let model_json = serde_json::to_vec(&ModelFile {
            training_id: artifact.training_id.clone(),
            name: artifact.name.clone(),
            trained_at: artifact.trained_at,
            score: artifact.score,
            forest: artifact.forest.clone(),
        })
        .map_err(StorageError::from)?;

        let scaler_path = self.scaler_path(&artifact.name);
        let model_path = self.model_path(&artifact.name);
        let scaler_tmp = temp_path(&scaler_path);
        let model_tmp = temp_path(&model_path);

        let written = write_synced(&scaler_tmp, &scaler_json)
            .and_then(|()| write_synced(&model_tmp, &model_json))
            .and_then(|()| fs::rename(&scaler_tmp, &scaler_path))
            .and_then(|()| fs::rename(&model_tmp, &model_path));
        if let Err(e) = written {
            for tmp in [&scaler_tmp, &model_tmp] {
                if let Err(rm) = fs::remove_file(tmp) {
                    if rm.kind() != io::ErrorKind::NotFound {
                        warn!(path = %tmp.display(), error = %rm, "Failed to remove temp file");
                    }
                }
            }
            return Err(StorageError::Io(e).into());
        }

        let artifact = Arc::new(artifact);
        slot.cached.store(Some(Arc::clone(&artifact)));

        info!(
            model = %artifact.name,
            training_id = %artifact.training_id,
            bytes = model_json.len() + scaler_json.len(),
            "Model saved"
        );
        Ok(artifact)
    }

    /// Load the artifact pair for `name`.
    ///
    /// The cached artifact is returned when the scaler on disk still names
    /// its training run; otherwise the pair is re-read.
    pub fn load(&self, name: &str) -> Result<Arc<ModelArtifact>, ServiceError> {
        check_name(name)?;
        let slot = self.slot(name)?;
        let _guard = slot
            .lock
            .read()
            .map_err(|_| ServiceError::Internal(format!("model lock poisoned: {name}")))?;

        let scaler: ScalerFile = read_json(&self.scaler_path(name), name)?;
        if let Some(cached) = slot.cached.load_full() {
            if cached.training_id == scaler.training_id {
                return Ok(cached);
            }
            debug!(
                model = %name,
                cached_id = %cached.training_id,
                disk_id = %scaler.training_id,
                "Stored pair replaced externally, reloading"
            );
        }

        let model: ModelFile = read_json(&self.model_path(name), name)?;

        if model.training_id != scaler.training_id {
            warn!(
                model = %name,
                model_id = %model.training_id,
                scaler_id = %scaler.training_id,
                "Model and scaler files come from different training runs"
            );
            return Err(StorageError::PairMismatch {
                name: name.to_string(),
                model_id: model.training_id,
                scaler_id: scaler.training_id,
            }
            .into());
        }
        if !model.forest.is_well_formed() {
            return Err(ServiceError::Internal(format!(
                "stored forest for '{name}' is malformed"
            )));
        }

        let artifact = Arc::new(ModelArtifact {
            name: name.to_string(),
            training_id: model.training_id,
            trained_at: model.trained_at,
            score: model.score,
            forest: model.forest,
            scaler: scaler.scaler,
        });
        slot.cached.store(Some(Arc::clone(&artifact)));

        debug!(model = %name, training_id = %artifact.training_id, "Model loaded from disk");
        Ok(artifact)
    }

    /// Whether both files of the pair are present. Invalid names never exist.
    pub fn exists(&self, name: &str) -> bool {
        is_valid_model_name(name)
            && self.model_path(name).is_file()
            && self.scaler_path(name).is_file()
    }

    fn slot(&self, name: &str) -> Result<Arc<ModelSlot>, ServiceError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| ServiceError::Internal("model slot table poisoned".to_string()))?;
        Ok(Arc::clone(slots.entry(name.to_string()).or_default()))
    }
}

fn check_name(name: &str) -> Result<(), ServiceError> {
    if is_valid_model_name(name) {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "invalid model name '{name}': use 1-64 characters of [A-Za-z0-9_-]"
        )))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, name: &str) -> Result<T, ServiceError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ServiceError::ModelNotFound(name.to_string()));
        }
        Err(e) => return Err(StorageError::Io(e).into()),
    };
    Ok(serde_json::from_slice(&bytes).map_err(StorageError::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ForestConfig, TrainingConfig};
    use crate::ml_engine::trainer::train_synthetic;

    fn artifact(name: &str, training_id: &str) -> ModelArtifact {
        let model = train_synthetic(
            &TrainingConfig {
                sample_count: 40,
                ..TrainingConfig::default()
            },
            &ForestConfig {
                tree_count: 4,
                ..ForestConfig::default()
            },
        )
        .unwrap();
        ModelArtifact {
            name: name.to_string(),
            training_id: training_id.to_string(),
            trained_at: Utc::now(),
            score: model.score,
            forest: model.forest,
            scaler: model.scaler,
        }
    }

    #[test]
    fn test_save_then_load_from_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let original = artifact("yield_model", "run-1");

        ModelStore::new(dir.path()).save(original.clone()).unwrap();
        assert!(dir.path().join("yield_model.model.json").is_file());
        assert!(dir.path().join("yield_model_scaler.json").is_file());

        let loaded = ModelStore::new(dir.path()).load("yield_model").unwrap();
        assert_eq!(*loaded, original);
    }

    #[test]
    fn test_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("not-yet-created"));
        assert!(!store.exists("yield_model"));
        let err = store.load("yield_model").unwrap_err();
        assert!(matches!(err, ServiceError::ModelNotFound(ref n) if n == "yield_model"));
    }

    #[test]
    fn test_missing_scaler_half() {
        let dir = tempfile::tempdir().unwrap();
        ModelStore::new(dir.path()).save(artifact("m", "run-1")).unwrap();
        fs::remove_file(dir.path().join("m_scaler.json")).unwrap();

        let store = ModelStore::new(dir.path());
        assert!(!store.exists("m"));
        assert!(matches!(store.load("m").unwrap_err(), ServiceError::ModelNotFound(_)));
    }

    #[test]
    fn test_pair_mismatch_detected() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        ModelStore::new(dir.path()).save(artifact("m", "run-1")).unwrap();
        ModelStore::new(other.path()).save(artifact("m", "run-2")).unwrap();
        // Simulate a crash after only the scaler was replaced
        fs::copy(other.path().join("m_scaler.json"), dir.path().join("m_scaler.json")).unwrap();

        let err = ModelStore::new(dir.path()).load("m").unwrap_err();
        match err {
            ServiceError::Storage(StorageError::PairMismatch { model_id, scaler_id, .. }) => {
                assert_eq!(model_id, "run-1");
                assert_eq!(scaler_id, "run-2");
            }
            other => panic!("expected PairMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_save_replaces_cached_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        store.save(artifact("m", "run-1")).unwrap();
        assert_eq!(store.load("m").unwrap().training_id, "run-1");
        store.save(artifact("m", "run-2")).unwrap();
        assert_eq!(store.load("m").unwrap().training_id, "run-2");
    }

    #[test]
    fn test_pair_replaced_by_other_store_is_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let serving = ModelStore::new(dir.path());
        serving.save(artifact("m", "run-1")).unwrap();
        assert_eq!(serving.load("m").unwrap().training_id, "run-1");

        ModelStore::new(dir.path()).save(artifact("m", "run-2")).unwrap();
        assert_eq!(serving.load("m").unwrap().training_id, "run-2");

        // Unchanged pair keeps coming from cache
        let a = serving.load("m").unwrap();
        let b = serving.load("m").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_pair_deleted_on_disk_is_not_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        store.save(artifact("m", "run-1")).unwrap();
        fs::remove_file(dir.path().join("m_scaler.json")).unwrap();
        assert!(matches!(store.load("m").unwrap_err(), ServiceError::ModelNotFound(_)));
    }

    #[test]
    fn test_failed_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        // A directory at the model path makes the final rename fail
        fs::create_dir(dir.path().join("m.model.json")).unwrap();
        fs::write(dir.path().join("m.model.json").join("occupied"), b"x").unwrap();

        let err = store.save(artifact("m", "run-1")).unwrap_err();
        assert!(matches!(err, ServiceError::Storage(StorageError::Io(_))));
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "leftover temp files: {leftovers:?}");
    }

    #[test]
    fn test_invalid_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        assert!(matches!(
            store.load("../escape").unwrap_err(),
            ServiceError::InvalidInput(_)
        ));
        assert!(matches!(
            store.save(artifact("bad name", "x")).unwrap_err(),
            ServiceError::InvalidInput(_)
        ));
        assert!(!store.exists("../escape"));
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        ModelStore::new(dir.path()).save(artifact("m", "run-1")).unwrap();
        fs::write(dir.path().join("m.model.json"), b"{not json").unwrap();
        let err = ModelStore::new(dir.path()).load("m").unwrap_err();
        assert!(matches!(err, ServiceError::Storage(StorageError::Serialization(_))));
    }

    #[test]
    fn test_concurrent_readers_during_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ModelStore::new(dir.path()));
        store.save(artifact("m", "run-1")).unwrap();
        let next = artifact("m", "run-2");

        std::thread::scope(|s| {
            for _ in 0..4 {
                let store = Arc::clone(&store);
                s.spawn(move || {
                    for _ in 0..20 {
                        let a = store.load("m").unwrap();
                        assert!(a.training_id == "run-1" || a.training_id == "run-2");
                    }
                });
            }
            store.save(next).unwrap();
        });
        assert_eq!(store.load("m").unwrap().training_id, "run-2");
    }
}
