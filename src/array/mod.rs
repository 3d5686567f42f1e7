//! Array Store Module
//!
//! Dense, named-dimension arrays and the partition files that hold them.
//!
//! Every repository file, query input and climatology grid in the cluster is a
//! `DatasetFile`: an absolute start instant, a vector of offsets along the
//! time-variation dimension and one `Grid` per data variable. The on-disk codec is
//! hidden behind the `ArrayStore` trait so the search engine never depends on it.
//!
//! ## Submodules
//! - **`grid`**: `Grid`, an `ndarray::ArrayD<f64>` addressed by dimension names (`NaN` = missing).
//! - **`dataset`**: `DatasetFile`, the time-indexed container of grids plus coordinates.
//! - **`store`**: `ArrayStore` trait and the `BincodeStore` implementation.
//! - **`time`**: nanosecond instants, result-key formatting and parsing.

pub mod grid;
pub mod dataset;
pub mod store;
pub mod time;

pub use dataset::{DatasetFile, DatasetSelectionParameter};
pub use grid::Grid;
pub use store::{ArrayStore, BincodeStore};
