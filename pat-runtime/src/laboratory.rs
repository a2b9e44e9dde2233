//! Registry of experiments run by this process.
use crate::error::{LabError, StoreError};
use crate::store::Store;
use pat::{CancelHandle, ExperimentError, RunConfig, RunnableExperiment, Sample};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn, Instrument};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ExperimentState {
    Running,
    Finished,
    Failed(String),
}

impl fmt::Display for ExperimentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentState::Running => f.write_str("Running"),
            ExperimentState::Finished => f.write_str("Finished"),
            ExperimentState::Failed(err) => write!(f, "Failed: {err}"),
        }
    }
}

/// What the laboratory knows about one experiment.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExperimentRecord {
    pub guid: String,
    pub config: RunConfig,
    pub state: ExperimentState,
}

struct Entry {
    record: ExperimentRecord,
    cancel: CancelHandle,
    task: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Registry {
    order: Vec<String>,
    entries: HashMap<String, Entry>,
}

/// Runs experiments in the background and records their samples into a [`Store`].
pub struct Laboratory<S: Store> {
    store: Arc<S>,
    registry: Arc<Mutex<Registry>>,
}

impl<S: Store> Clone for Laboratory<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<S: Store> fmt::Debug for Laboratory<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Laboratory").finish_non_exhaustive()
    }
}

impl<S: Store> Laboratory<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Starts `experiment` in the background and returns its guid.
    ///
    /// The configuration is validated first; an invalid experiment is never registered.
    #[instrument(name = "lab", skip_all, fields(workload = %experiment.config().run.workload))]
    pub fn run(&self, experiment: RunnableExperiment) -> Result<String, LabError> {
        experiment
            .config()
            .validate()
            .map_err(ExperimentError::from)?;

        let guid = uuid::Uuid::new_v4().to_string();
        self.store.create(&guid)?;

        let record = ExperimentRecord {
            guid: guid.clone(),
            config: experiment.config().run.clone(),
            state: ExperimentState::Running,
        };
        let cancel = experiment.cancel_handle();

        // Registered before spawning so a fast experiment cannot finish unregistered.
        let mut registry = self.registry.lock()?;
        registry.order.push(guid.clone());

        let store = self.store.clone();
        let lab_registry = self.registry.clone();
        let task_guid = guid.clone();
        let task = tokio::spawn(
            async move {
                let tracker_guid = task_guid.clone();
                let result = experiment
                    .run(move |mut samples| async move {
                        while let Some(sample) = samples.next().await {
                            if let Err(err) = store.append(&tracker_guid, &sample) {
                                error!("Failed to record sample for {tracker_guid}: {err}");
                            }
                        }
                    })
                    .await;

                let state = match result {
                    Ok(()) => ExperimentState::Finished,
                    Err(err) => {
                        error!("Experiment {task_guid} failed: {err}");
                        ExperimentState::Failed(err.to_string())
                    }
                };
                info!("Experiment {task_guid} {state}");

                match lab_registry.lock() {
                    Ok(mut registry) => {
                        if let Some(entry) = registry.entries.get_mut(&task_guid) {
                            entry.record.state = state;
                        }
                    }
                    Err(_) => error!("Experiment registry is poisoned."),
                }
            }
            .in_current_span(),
        );

        registry.entries.insert(
            guid.clone(),
            Entry {
                record,
                cancel,
                task: Some(task),
            },
        );
        info!("Started experiment {guid}");

        Ok(guid)
    }

    /// Calls `func` with every known experiment, oldest first.
    pub fn visit<F>(&self, mut func: F) -> Result<(), LabError>
    where
        F: FnMut(&ExperimentRecord),
    {
        let registry = self.registry.lock()?;
        for guid in &registry.order {
            if let Some(entry) = registry.entries.get(guid) {
                func(&entry.record);
            }
        }
        Ok(())
    }

    pub fn experiments(&self) -> Result<Vec<ExperimentRecord>, LabError> {
        let mut records = vec![];
        self.visit(|record| records.push(record.clone()))?;
        Ok(records)
    }

    pub fn experiment(&self, guid: &str) -> Result<ExperimentRecord, LabError> {
        let registry = self.registry.lock()?;
        registry
            .entries
            .get(guid)
            .map(|entry| entry.record.clone())
            .ok_or_else(|| StoreError::NotFound(guid.to_string()).into())
    }

    /// Samples recorded so far for `guid`.
    pub fn data(&self, guid: &str) -> Result<Vec<Sample>, LabError> {
        if !self.registry.lock()?.entries.contains_key(guid) {
            return Err(StoreError::NotFound(guid.to_string()).into());
        }
        Ok(self.store.samples(guid)?)
    }

    /// Stops `guid` from starting new cycles.
    pub fn cancel(&self, guid: &str) -> Result<(), LabError> {
        let registry = self.registry.lock()?;
        let entry = registry
            .entries
            .get(guid)
            .ok_or_else(|| StoreError::NotFound(guid.to_string()))?;
        info!("Cancelling experiment {guid}");
        entry.cancel.cancel();
        Ok(())
    }

    /// Waits for `guid` to finish. Returns immediately if it already has been waited on.
    pub async fn wait(&self, guid: &str) -> Result<ExperimentRecord, LabError> {
        let task = {
            let mut registry = self.registry.lock()?;
            registry
                .entries
                .get_mut(guid)
                .ok_or_else(|| StoreError::NotFound(guid.to_string()))?
                .task
                .take()
        };
        if let Some(task) = task {
            if let Err(err) = task.await {
                error!("Experiment task for {guid} failed: {err}");
            }
        }
        self.experiment(guid)
    }
}
