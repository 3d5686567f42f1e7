//! Worker Controller Module
//!
//! Serves the search RPC on a worker: maps one transfer port per query file, receives
//! the files, runs the configured search and streams the analogues back.
//!
//! ## Responsibilities
//! - **Brute force**: One full scan of the local partition per request.
//! - **Ndrank**: A first phase merged across workers through the message queue, then a
//!   full-resolution refinement of the merged list (`ControllerState` traces each step).
//! - **Resolution reduction**: Coarsening received inputs to the low-resolution partition.
//! - **Cleanup**: Received and reduced files are removed after the answer, and always on error.
//!
//! ## Submodules
//! - **`types`**: `ControllerState` and `StateTrace`.
//! - **`parameters`**: RPC message to service type conversions.
//! - **`reduction`**: Resolution reduction of query files.
//! - **`intake`**: Port mapping, reception, blocking execution and cleanup.
//! - **`brute_force`**: `BruteForceController`.
//! - **`ndrank`**: `NdrankController`.

pub mod types;
pub mod parameters;
pub mod reduction;
pub mod intake;
pub mod brute_force;
pub mod ndrank;

pub use brute_force::BruteForceController;
pub use ndrank::NdrankController;
pub use types::{ControllerState, StateTrace};

#[cfg(test)]
mod tests;
