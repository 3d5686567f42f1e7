//! Master Module
//!
//! Drives a requests file against the worker fleet and writes the ranked analogues.
//!
//! ## Responsibilities
//! - **Fan-out**: Every request goes to every worker at once; each worker's query files
//!   are uploaded to the ports it mapped.
//! - **Merging**: Raw similarity sums are added per timestamp across workers, incomplete
//!   timestamps are dropped and the rest is ranked by the correlation function's order.
//! - **Reporting**: One CSV per request plus a run log covering successes and failures.
//!
//! ## Submodules
//! - **`types`**: `NodeOutcome`, `RankedAnalogue`, `SearchResult`.
//! - **`request`**: Request ids and RPC request assembly.
//! - **`client`**: `NodeClient`.
//! - **`merge`**: `merge_results`.
//! - **`report`**: CSV output and `RunLog`.
//! - **`runner`**: `Master`.

pub mod types;
pub mod request;
pub mod client;
pub mod merge;
pub mod report;
pub mod runner;

pub use client::NodeClient;
pub use merge::{MergeParameters, merge_results};
pub use runner::Master;
pub use types::{NodeOutcome, RankedAnalogue, SearchResult};
