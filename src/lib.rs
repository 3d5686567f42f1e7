//! Distributed Analogue Search Library
//!
//! This library crate defines the modules behind the `analogue-cluster` binary
//! (`main.rs`): workers that search local partitions of a reanalysis dataset for time
//! instants resembling a query, an aggregator that merges their first-phase output, and a
//! master that fans requests out and ranks the final analogues.
//!
//! ## Architecture Modules
//!
//! - **`array`**: Named-dimension grids, partition files and the `ArrayStore` codec.
//! - **`repository`**: Indexed access to the partition folders of a worker, time gaps and
//!   partition metadata.
//! - **`correlation`**: Similarity functions (`pcc`, `enhanced_pcc`, `rmsd`) with exact
//!   values and cheap best/worst bounds.
//! - **`service`**: The search services: a full scan, its top-N variant and candidate screening.
//! - **`registry`**: Startup table of correlation functions and search services by name.
//! - **`transfer`**: The port-per-file transfer of query files from the master.
//! - **`queue`**: Message broker abstraction, its payloads and HTTP transport.
//! - **`aggregator`**: Cross-worker merging of partial results and candidates.
//! - **`rpc`**: The streamed search call between master and workers.
//! - **`controller`**: Per-request state machines of a worker (brute force and ndrank).
//! - **`master`**: Request fan-out, result merging and reports.
//! - **`config`**: JSON property files of every process.

pub mod array;
pub mod repository;
pub mod correlation;
pub mod service;
pub mod registry;
pub mod transfer;
pub mod queue;
pub mod aggregator;
pub mod rpc;
pub mod controller;
pub mod master;
pub mod config;

#[cfg(test)]
pub(crate) mod fixtures;
