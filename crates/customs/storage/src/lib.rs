//! Storage for customs classification jobs.
//!
//! Two contracts:
//! - the job registry (description, destination, operator abort flag)
//! - conversation checkpoints, persisted after every round for resume
//!
//! The in-memory adapter is the default; PostgreSQL sits behind the
//! `postgres` feature.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod model;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryCustomsStorage;
pub use model::JobRecord;
pub use traits::{CheckpointStore, CustomsStorage, JobStore, QueryWindow};
