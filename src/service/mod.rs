//! Yield service façade
//!
//! Owns the model store and training ledger, and exposes the three model
//! operations as async methods:
//!
//! - **Train**: generate → fit → save → record, on the blocking pool
//! - **Predict**: load → validate → scale → regress
//! - **Optimize**: load → parse ranges → grid search
//!
//! CPU-bound work runs under `spawn_blocking`; train and optimize are bounded
//! by a caller deadline (or the configured default). Expiry returns
//! `DeadlineExceeded` but does not cancel the worker, so a timed-out train
//! still finishes its atomic save.
//!
//! ## Readiness
//!
//! The service starts `Initializing`. [`YieldService::bootstrap`] trains the
//! default model if it is missing and flips readiness to `Ready` (or
//! `Failed`). Predict and optimize return `NotReady` until then. A later
//! successful train lifts a `Failed` state to `Ready`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::ml_engine::{optimizer, predictor, trainer};
use crate::storage::{ModelArtifact, ModelStore, TrainingHistory};
use crate::types::{OptimizationRequest, OptimizationResult, Prediction, ServiceError, TrainReport};

/// Startup state of the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum Readiness {
    Initializing,
    Ready,
    Failed(String),
}

impl Readiness {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

/// Caller overrides for a training run. Absent fields use the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainOptions {
    pub seed: Option<u64>,
    pub sample_count: Option<usize>,
    pub timeout_ms: Option<u64>,
}

/// Caller options for a grid search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptimizeOptions {
    pub grid_points: Option<usize>,
    pub timeout_ms: Option<u64>,
}

pub struct YieldService {
    config: Arc<ServiceConfig>,
    store: Arc<ModelStore>,
    history: Arc<TrainingHistory>,
    readiness: ArcSwap<Readiness>,
    started_at: Instant,
}

impl YieldService {
    /// Open the model store and the on-disk training ledger.
    pub fn open(config: Arc<ServiceConfig>) -> Result<Self, ServiceError> {
        let history = TrainingHistory::open(&config.storage.history_db)?;
        Ok(Self::with_history(config, history))
    }

    /// Build with an explicit ledger (e.g. `TrainingHistory::open_temp()`).
    pub fn with_history(config: Arc<ServiceConfig>, history: TrainingHistory) -> Self {
        let store = ModelStore::new(&config.storage.models_dir);
        Self {
            config,
            store: Arc::new(store),
            history: Arc::new(history),
            readiness: ArcSwap::from_pointee(Readiness::Initializing),
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn readiness(&self) -> Arc<Readiness> {
        self.readiness.load_full()
    }

    pub fn is_ready(&self) -> bool {
        matches!(**self.readiness.load(), Readiness::Ready)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn default_model_exists(&self) -> bool {
        self.store.exists(&self.config.storage.default_model)
    }

    /// Startup initialization.
    ///
    /// Trains the default model when it is absent (or always, with
    /// `force_retrain`) and records the outcome as the readiness state.
    /// With `training.bootstrap = false` and no forced retrain the service
    /// becomes ready without a model.
    pub async fn bootstrap(&self, force_retrain: bool) -> Result<(), ServiceError> {
        let name = &self.config.storage.default_model;
        let needs_model = !self.store.exists(name);
        let should_train = force_retrain || (needs_model && self.config.training.bootstrap);

        if should_train {
            info!(model = %name, forced = force_retrain, "Bootstrap: training default model");
            if let Err(e) = self.train(TrainOptions::default()).await {
                error!(model = %name, error = %e, "Bootstrap training failed");
                self.readiness.store(Arc::new(Readiness::Failed(e.to_string())));
                return Err(e);
            }
        } else if needs_model {
            warn!(model = %name, "Bootstrap disabled and no model on disk; train before predicting");
        } else {
            info!(model = %name, "Bootstrap: found existing model");
        }

        self.readiness.store(Arc::new(Readiness::Ready));
        info!("Service ready");
        Ok(())
    }

    /// Train the default model on freshly generated synthetic data.
    pub async fn train(&self, options: TrainOptions) -> Result<TrainReport, ServiceError> {
        let mut training = self.config.training.clone();
        if let Some(seed) = options.seed {
            training.seed = seed;
        }
        if let Some(n) = options.sample_count {
            if n > training.max_sample_count {
                return Err(ServiceError::InvalidInput(format!(
                    "sample_count = {n} exceeds the limit of {}",
                    training.max_sample_count
                )));
            }
            training.sample_count = n;
        }
        let deadline = resolve_deadline(options.timeout_ms, training.timeout())?;

        let forest = self.config.forest.clone();
        let name = self.config.storage.default_model.clone();
        let store = Arc::clone(&self.store);
        let history = Arc::clone(&self.history);

        let started = Instant::now();
        let report = run_with_deadline(deadline, move || {
            let model = trainer::train_synthetic(&training, &forest)?;
            let artifact = store.save(ModelArtifact {
                name,
                training_id: Uuid::new_v4().to_string(),
                trained_at: Utc::now(),
                score: model.score,
                forest: model.forest,
                scaler: model.scaler,
            })?;

            let report = TrainReport {
                model_name: artifact.name.clone(),
                training_id: artifact.training_id.clone(),
                trained_at: artifact.trained_at,
                score: artifact.score,
                train_samples: model.train_samples,
                test_samples: model.test_samples,
                tree_count: artifact.forest.tree_count(),
                data_seed: training.seed,
            };
            if let Err(e) = history.record(&report) {
                warn!(error = %e, training_id = %report.training_id, "Failed to record training run");
            }
            Ok(report)
        })
        .await?;

        // A saved default model is servable, whatever happened at startup
        if let Readiness::Failed(reason) = &**self.readiness.load() {
            info!(previous_failure = %reason, "Default model trained, service now ready");
            self.readiness.store(Arc::new(Readiness::Ready));
        }

        info!(
            model = %report.model_name,
            score = report.score,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Training complete"
        );
        Ok(report)
    }

    /// Predict the yield for four raw feature values.
    pub async fn predict(&self, features: Vec<f64>) -> Result<Prediction, ServiceError> {
        self.ensure_ready()?;
        let store = Arc::clone(&self.store);
        let name = self.config.storage.default_model.clone();
        tokio::task::spawn_blocking(move || predictor::predict(&store, &name, &features)).await?
    }

    /// Grid search over the wire-format ranges.
    ///
    /// The model is resolved before the ranges are parsed, so a missing model
    /// takes precedence over malformed ranges.
    pub async fn optimize(
        &self,
        ranges: HashMap<String, Vec<f64>>,
        options: OptimizeOptions,
    ) -> Result<OptimizationResult, ServiceError> {
        self.ensure_ready()?;
        let limits = self.config.optimizer.clone();
        let grid_points = options.grid_points.unwrap_or(limits.grid_points);
        let deadline = resolve_deadline(options.timeout_ms, limits.timeout())?;
        let store = Arc::clone(&self.store);
        let name = self.config.storage.default_model.clone();

        let started = Instant::now();
        let result = run_with_deadline(deadline, move || {
            let artifact = store.load(&name)?;
            let request = OptimizationRequest::from_map(&ranges)?;
            optimizer::check_grid_points(grid_points, &limits)?;
            optimizer::optimize_with(&artifact, &request, grid_points)
        })
        .await?;

        info!(
            evaluated = result.evaluated_points,
            predicted_yield = result.predicted_yield,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Optimization complete"
        );
        Ok(result)
    }

    /// Recent training runs, newest first.
    pub async fn history(&self, limit: usize) -> Result<Vec<TrainReport>, ServiceError> {
        let history = Arc::clone(&self.history);
        tokio::task::spawn_blocking(move || -> Result<_, ServiceError> {
            Ok(history.recent(limit)?)
        })
        .await?
    }

    /// Latest recorded run of the default model, if any.
    pub async fn last_training(&self) -> Result<Option<TrainReport>, ServiceError> {
        let history = Arc::clone(&self.history);
        let name = self.config.storage.default_model.clone();
        tokio::task::spawn_blocking(move || -> Result<_, ServiceError> {
            Ok(history.latest_for(&name)?)
        })
        .await?
    }

    fn ensure_ready(&self) -> Result<(), ServiceError> {
        match &**self.readiness.load() {
            Readiness::Ready => Ok(()),
            Readiness::Initializing => Err(ServiceError::NotReady(
                "service is still initializing".to_string(),
            )),
            Readiness::Failed(reason) => Err(ServiceError::NotReady(format!(
                "initialization failed: {reason}"
            ))),
        }
    }
}

fn resolve_deadline(timeout_ms: Option<u64>, default: Duration) -> Result<Duration, ServiceError> {
    match timeout_ms {
        Some(0) => Err(ServiceError::InvalidInput("timeout_ms must be > 0".to_string())),
        Some(ms) => Ok(Duration::from_millis(ms)),
        None => Ok(default),
    }
}

/// Run `work` on the blocking pool, giving up on the result after `deadline`.
async fn run_with_deadline<T, F>(deadline: Duration, work: F) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(deadline, handle).await {
        Ok(joined) => joined?,
        Err(_) => {
            warn!(deadline_ms = deadline.as_millis() as u64, "Deadline exceeded");
            Err(ServiceError::DeadlineExceeded(deadline))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForestConfig;

    fn test_service(dir: &std::path::Path, bootstrap: bool) -> YieldService {
        let mut config = ServiceConfig::default();
        config.storage.models_dir = dir.to_path_buf();
        config.training.bootstrap = bootstrap;
        config.forest = ForestConfig {
            tree_count: 10,
            ..ForestConfig::default()
        };
        YieldService::with_history(Arc::new(config), TrainingHistory::open_temp().unwrap())
    }

    fn domain() -> HashMap<String, Vec<f64>> {
        [
            ("temperature", vec![50.0, 150.0]),
            ("pressure", vec![1.0, 10.0]),
            ("catalystAmount", vec![0.1, 2.0]),
            ("reactionTime", vec![1.0, 24.0]),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[tokio::test]
    async fn test_not_ready_before_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), true);
        assert_eq!(*service.readiness(), Readiness::Initializing);
        let err = service.predict(vec![100.0, 5.0, 1.0, 12.0]).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotReady(_)));
        let err = service.optimize(domain(), OptimizeOptions::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotReady(_)));
    }

    #[tokio::test]
    async fn test_bootstrap_trains_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), true);
        assert!(!service.default_model_exists());
        service.bootstrap(false).await.unwrap();
        assert!(service.is_ready());
        assert!(service.default_model_exists());
        assert_eq!(service.history(10).await.unwrap().len(), 1);

        // Second bootstrap reuses the stored model
        service.bootstrap(false).await.unwrap();
        assert_eq!(service.history(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ready_without_model_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), false);
        service.bootstrap(false).await.unwrap();
        assert!(service.is_ready());
        let err = service.predict(vec![100.0, 5.0, 1.0, 12.0]).await.unwrap_err();
        assert!(matches!(err, ServiceError::ModelNotFound(_)));
        let err = service.optimize(domain(), OptimizeOptions::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_model_precedes_bad_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), false);
        service.bootstrap(false).await.unwrap();
        let err = service.optimize(HashMap::new(), OptimizeOptions::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn test_train_overrides_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), false);
        let report = service
            .train(TrainOptions {
                seed: Some(7),
                sample_count: Some(50),
                timeout_ms: None,
            })
            .await
            .unwrap();
        assert_eq!(report.data_seed, 7);
        assert_eq!(report.train_samples + report.test_samples, 50);
        assert_eq!(report.tree_count, 10);
        assert!(report.score.is_finite());
        assert_eq!(service.last_training().await.unwrap().unwrap().training_id, report.training_id);
        assert_eq!(service.store().load("yield_model").unwrap().training_id, report.training_id);
    }

    #[tokio::test]
    async fn test_train_rejects_bad_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), false);
        let err = service
            .train(TrainOptions {
                sample_count: Some(1),
                ..TrainOptions::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientData(_)));

        let err = service
            .train(TrainOptions {
                sample_count: Some(10_000_000),
                ..TrainOptions::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = service
            .train(TrainOptions {
                timeout_ms: Some(0),
                ..TrainOptions::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_train_deadline_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), false);
        let err = service
            .train(TrainOptions {
                sample_count: Some(5_000),
                timeout_ms: Some(1),
                ..TrainOptions::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DeadlineExceeded(d) if d == Duration::from_millis(1)));
    }

    #[tokio::test]
    async fn test_predict_and_optimize_after_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let service = test_service(dir.path(), true);
        service.bootstrap(false).await.unwrap();

        let p = service.predict(vec![100.0, 5.0, 1.0, 12.0]).await.unwrap();
        assert!((0.0..=100.0).contains(&p.prediction));

        let r = service
            .optimize(
                domain(),
                OptimizeOptions {
                    grid_points: Some(4),
                    timeout_ms: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(r.evaluated_points, 256);
        assert!(r.predicted_yield.is_finite());

        let err = service
            .optimize(
                domain(),
                OptimizeOptions {
                    grid_points: Some(41),
                    timeout_ms: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_failed_bootstrap_sets_failed_readiness() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServiceConfig::default();
        config.storage.models_dir = dir.path().to_path_buf();
        config.training.sample_count = 1;
        let service =
            YieldService::with_history(Arc::new(config), TrainingHistory::open_temp().unwrap());
        assert!(service.bootstrap(false).await.is_err());
        assert!(matches!(*service.readiness(), Readiness::Failed(_)));
        let err = service.predict(vec![1.0, 2.0, 3.0, 4.0]).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotReady(_)));
    }

    #[tokio::test]
    async fn test_train_after_failed_bootstrap_restores_readiness() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServiceConfig::default();
        config.storage.models_dir = dir.path().to_path_buf();
        config.training.sample_count = 1;
        config.forest.tree_count = 10;
        let service =
            YieldService::with_history(Arc::new(config), TrainingHistory::open_temp().unwrap());
        assert!(service.bootstrap(false).await.is_err());

        // A failed train leaves the failure in place
        assert!(service.train(TrainOptions::default()).await.is_err());
        assert!(matches!(*service.readiness(), Readiness::Failed(_)));

        service
            .train(TrainOptions {
                sample_count: Some(100),
                ..TrainOptions::default()
            })
            .await
            .unwrap();
        assert!(service.is_ready());
        let p = service.predict(vec![100.0, 5.0, 1.0, 12.0]).await.unwrap();
        assert!(p.prediction.is_finite());
        let options = OptimizeOptions {
            grid_points: Some(3),
            timeout_ms: None,
        };
        service.optimize(domain(), options).await.unwrap();
    }
}
