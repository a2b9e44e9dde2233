#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Lets `#[step]` expand to `::pat::...` inside this crate as well.
extern crate self as pat;

pub mod error;
pub mod experiment;
pub mod executor;
pub(crate) mod sampler;
pub mod step;
pub mod workload;

pub use error::{ConfigError, ExperimentError};
pub use executor::CancelHandle;
pub use experiment::{ExperimentConfiguration, RunnableExperiment, SampleStream};
pub use pat_macros::step;
pub use workload::{Worker, WorkerCapability, Workload, WorkloadError, WorkloadInvoker};

#[doc(hidden)]
pub use pat_core as core;
pub use pat_core::{
    Command, ErrorInfo, ErrorKind, IterationResult, RunConfig, Sample, SampleType, Step,
};

pub mod prelude {
    pub use crate::experiment::{ExperimentConfiguration, RunnableExperiment, SampleStream};
    pub use crate::workload::{Worker, WorkerCapability, Workload, WorkloadError};
    pub use crate::{CancelHandle, ConfigError, ExperimentError};
    pub use pat_core::{Command, ErrorInfo, RunConfig, Sample, SampleType};
    pub use pat_macros::step;
}
