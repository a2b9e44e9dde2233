//! Sample persistence keyed by experiment guid.
use crate::error::StoreError;
use pat_core::Sample;
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
#[allow(unused)]
use tracing::{debug, error, info, trace};

/// Append-only record of the samples emitted by each experiment.
pub trait Store: Send + Sync + 'static {
    /// Registers an empty sample series for `guid`.
    fn create(&self, guid: &str) -> Result<(), StoreError>;

    fn append(&self, guid: &str, sample: &Sample) -> Result<(), StoreError>;

    /// Recorded samples for `guid`, in the order they were appended.
    fn samples(&self, guid: &str) -> Result<Vec<Sample>, StoreError>;

    /// Known guids, in creation order.
    fn guids(&self) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Default)]
struct Series {
    order: Vec<String>,
    samples: HashMap<String, Vec<Sample>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Series>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn create(&self, guid: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock()?;
        if !inner.samples.contains_key(guid) {
            inner.order.push(guid.to_string());
            inner.samples.insert(guid.to_string(), vec![]);
        }
        Ok(())
    }

    fn append(&self, guid: &str, sample: &Sample) -> Result<(), StoreError> {
        let mut inner = self.inner.lock()?;
        if !inner.samples.contains_key(guid) {
            inner.order.push(guid.to_string());
        }
        inner
            .samples
            .entry(guid.to_string())
            .or_default()
            .push(sample.clone());
        Ok(())
    }

    fn samples(&self, guid: &str) -> Result<Vec<Sample>, StoreError> {
        self.inner
            .lock()?
            .samples
            .get(guid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(guid.to_string()))
    }

    fn guids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.lock()?.order.clone())
    }
}

/// Writes one `<guid>.csv` file per experiment and serves reads from memory.
///
/// Rows are written and flushed synchronously under a lock, one per sample, on the
/// tracker's task.
pub struct CsvStore {
    dir: PathBuf,
    writers: Mutex<HashMap<String, csv::Writer<File>>>,
    memory: MemoryStore,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!("Writing experiment CSVs to {}", dir.display());
        Ok(Self {
            dir,
            writers: Mutex::new(HashMap::new()),
            memory: MemoryStore::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, guid: &str) -> PathBuf {
        self.dir.join(format!("{guid}.csv"))
    }

    fn open(&self, guid: &str) -> Result<csv::Writer<File>, StoreError> {
        let mut writer = csv::Writer::from_path(self.path(guid))?;
        writer.write_record(Sample::CSV_HEADER)?;
        writer.flush()?;
        Ok(writer)
    }
}

impl fmt::Debug for CsvStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl Store for CsvStore {
    fn create(&self, guid: &str) -> Result<(), StoreError> {
        let mut writers = self.writers.lock()?;
        if !writers.contains_key(guid) {
            writers.insert(guid.to_string(), self.open(guid)?);
        }
        self.memory.create(guid)
    }

    fn append(&self, guid: &str, sample: &Sample) -> Result<(), StoreError> {
        {
            let mut writers = self.writers.lock()?;
            if !writers.contains_key(guid) {
                writers.insert(guid.to_string(), self.open(guid)?);
            }
            if let Some(writer) = writers.get_mut(guid) {
                writer.write_record(sample.csv_record())?;
                writer.flush()?;
            }
        }
        self.memory.append(guid, sample)
    }

    fn samples(&self, guid: &str) -> Result<Vec<Sample>, StoreError> {
        self.memory.samples(guid)
    }

    fn guids(&self) -> Result<Vec<String>, StoreError> {
        self.memory.guids()
    }
}
