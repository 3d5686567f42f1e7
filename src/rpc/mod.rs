//! Search RPC Module
//!
//! One TCP connection per search call. The master sends a single `SearchRequest` frame and
//! the worker streams `SearchResponse` frames back: the port mapping, then the analogues, or
//! a terminal `Status` when the request failed.
//!
//! ## Submodules
//! - **`types`**: Request/response messages.
//! - **`codec`**: Length-prefixed bincode framing.
//! - **`server`**: `SearchController` and the bounded `RpcServer`.
//! - **`client`**: `SearchCall`.

pub mod types;
pub mod codec;
pub mod server;
pub mod client;

pub use client::SearchCall;
pub use server::{DEFAULT_MAX_WORKERS, ResponseSender, RpcServer, SearchController};
pub use types::*;
