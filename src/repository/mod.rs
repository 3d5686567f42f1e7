//! Repository Module
//!
//! Read access to the worker's local slice of the historical dataset.
//!
//! ## Responsibilities
//! - **Indexing**: Sorting partition files by the date encoded in their names and mapping
//!   `DateContainer`s back to files.
//! - **Iteration**: Streaming every file of a partition in time order for sequential search.
//! - **Point lookup**: Finding the file that covers one instant (heuristic refinement).
//! - **Gap tracking**: Reporting instants without data for a set of variables.
//!
//! ## Submodules
//! - **`date`**: `DateContainer`, the partially specified date used as index key.
//! - **`time_gap`**: `TimeGapContainer`.
//! - **`indexer`**: File-name conventions and `DatasetIndexer`.
//! - **`metadata`**: `settings.json` manifest and `RepositoryMetadata`.
//! - **`layer`**: `RepositoryLayer` trait and the ERA5 folder implementation.
//! - **`collection`**: `RepositoryCollection`.

pub mod date;
pub mod time_gap;
pub mod indexer;
pub mod metadata;
pub mod layer;
pub mod collection;

pub use collection::RepositoryCollection;
pub use date::DateContainer;
pub use layer::{Era5Repository, RepositoryKind, RepositoryLayer};
pub use metadata::RepositoryMetadata;
