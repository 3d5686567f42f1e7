//! Registry Module
//!
//! Explicit tag -> factory tables for the pluggable parts of a worker.
//!
//! ## Submodules
//! - **`components`**: `ComponentRegistry`.

pub mod components;

pub use components::{ComponentRegistry, CorrelationFactory, ServiceFactory};

#[cfg(test)]
mod tests;
