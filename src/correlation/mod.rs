//! Correlation Functions
//!
//! Similarity metrics used to rank historical instants against a query.
//!
//! Every metric implements `CorrelationFunction`: an exact `calculate`, an ordering
//! (`is_reverse_order` / `compare`) and, for metrics that support candidate screening,
//! a `calculate_partial_value` that bounds the final similarity from a sub-region.
//!
//! ## Submodules
//! - **`types`**: the trait, `TimeSlice` and `CorrelationStatistics`.
//! - **`pcc`**: plain Pearson (`pcc`).
//! - **`enhanced_pcc`**: Pearson over climatology anomalies (`enhanced_pcc`).
//! - **`rmsd`**: root mean square difference (`rmsd`).
//! - **`statistics`**: `StatisticsCollection`.

pub mod types;
pub mod pcc;
pub mod enhanced_pcc;
pub mod rmsd;
pub mod statistics;

pub use enhanced_pcc::EnhancedPcc;
pub use pcc::Pcc;
pub use rmsd::Rmsd;
pub use statistics::StatisticsCollection;
pub use types::{CorrelationFunction, CorrelationStatistics, TimeSlice};
