//! Search Service Module
//!
//! Computes similarity values between a query and the worker's local partition.
//!
//! ## Responsibilities
//! - **Full scan**: Sliding the query over every instant of the partition (`brute-force`).
//! - **Ranking**: Keeping only the best N complete results next to every partial one (`top-n`).
//! - **Refinement**: Searching only the neighbourhood of heuristic instants.
//! - **Screening**: Ranking bounded candidates over a selection box (`candidates`).
//!
//! ## Submodules
//! - **`types`**: `ResultContainer`, `CandidateContainer`, `RequestParameters` and aliases.
//! - **`input`**: `InputIterator` over the received query files.
//! - **`candidates`**: `CandidateListManager`.
//! - **`layer`**: the `SearchService` trait.
//! - **`brute_force`**: `BruteForceService`.
//! - **`top_n`**: `TopNService`, `CandidateService` and the top-N filter.

pub mod types;
pub mod input;
pub mod candidates;
pub mod layer;
pub mod brute_force;
pub mod top_n;

pub use brute_force::{BRUTE_FORCE_SERVICE, BruteForceService};
pub use candidates::CandidateListManager;
pub use input::InputIterator;
pub use layer::{SearchService, TS_DEBUG_TARGET};
pub use top_n::{CANDIDATES_SERVICE, CandidateService, TOP_N_SERVICE, TopNService};
pub use types::{
    CandidateContainer, CandidateResults, HeuristicResult, HeuristicValue, InputFiles,
    RequestParameters, ResultContainer, SearchResults,
};

#[cfg(test)]
mod tests;
