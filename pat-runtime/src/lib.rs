//! Outer surfaces of pat: sample stores, the experiment laboratory, the HTTP API and the
//! command line runtime.
pub mod demo;
pub mod error;
pub mod export;
pub mod laboratory;
pub mod runtime;
pub mod server;
pub mod store;

pub use crate::error::{LabError, RuntimeError, StoreError};
pub use crate::export::render_csv;
pub use crate::laboratory::{ExperimentRecord, ExperimentState, Laboratory};
pub use crate::runtime::{PatCli, PatRuntime};
pub use crate::server::{router, ServerState};
pub use crate::store::{CsvStore, MemoryStore, Store};
