//! Aggregator Module
//!
//! Merges the first-phase output of every worker into one reply per request.
//!
//! ## Responsibilities
//! - **Results**: Summing partial results across nodes, ranking complete ones and
//!   publishing the best N on the request's topic.
//! - **Candidates**: Merging candidate bounds and pruning those that cannot reach the top N
//!   before publishing on `candidate-<request id>`.
//! - **Protocol checks**: A second report of a node for the same request is rejected.
//!
//! ## Submodules
//! - **`types`**: `ResultsAggregate`, `CandidatesAggregate` and `AggregationError`.
//! - **`service`**: `AggregationService`.
//! - **`consumer`**: `AggregatorConsumer`, the polling loop.

pub mod types;
pub mod service;
pub mod consumer;

pub use consumer::AggregatorConsumer;
pub use service::AggregationService;
pub use types::{AggregationError, CandidatesAggregate, ResultsAggregate};
