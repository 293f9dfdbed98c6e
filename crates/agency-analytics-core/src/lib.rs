#![deny(clippy::all)]

mod activity;
mod aggregator;
pub mod assembler;
mod buckets;
mod error;
pub mod models;
mod ranking;
mod snapshot;
pub mod source;
mod status;

pub use activity::*;
pub use aggregator::*;
pub use assembler::{PassState, SnapshotAssembler};
pub use buckets::*;
pub use error::*;
pub use models::{ActivityLogEntry, Client, Invoice, Project, UNKNOWN_CLIENT};
pub use ranking::*;
pub use snapshot::*;
pub use source::{fetch_dataset, DataAccess, Dataset};
pub use status::*;
