//! File Transfer Module
//!
//! Raw TCP transfer of query files from the master to a worker.
//!
//! ## Responsibilities
//! - **Port allocation**: Mapping each announced file to a free port of the worker's range.
//! - **Receiving**: One listener and one background task per file, writing into the
//!   temporary folder.
//! - **Cleanup**: Ports are always released; failed requests leave no files behind.
//! - **Sending**: Streaming a local file to a mapped port (master side).
//!
//! ## Submodules
//! - **`types`**: `InputFileProperties`, `FilePortMapping` and `TransferError`.
//! - **`protocol`**: `FileProtocol` and `FileTransfer`.
//! - **`client`**: `upload_file`.

pub mod types;
pub mod protocol;
pub mod client;

pub use client::upload_file;
pub use protocol::{FileProtocol, FileTransfer, remove_files};
pub use types::{FilePortMapping, InputFileProperties, TransferError};
