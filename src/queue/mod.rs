//! Message Queue Module
//!
//! Topic-based transport between workers and the aggregator in the two-phase search.
//!
//! ## Responsibilities
//! - **Payloads**: Typed, schema-checked messages with the kebab-case wire names.
//! - **Broker**: An append-only topic log (`InMemoryBroker`), served over HTTP by the
//!   `broker` subcommand and reached remotely through `HttpBroker`.
//! - **Worker round trip**: Publishing partial results/candidates and blocking for the
//!   single merged reply on the request's own topic.
//!
//! ## Submodules
//! - **`types`**: Topic names, payload DTOs, `BrokerRecord` and `SchemaError`.
//! - **`broker`**: `MessageBroker` and `InMemoryBroker`.
//! - **`protocol`** / **`handlers`**: HTTP surface of the broker.
//! - **`http`**: `HttpBroker`.
//! - **`client`**: `QueueClient` and the payload conversions.

pub mod types;
pub mod broker;
pub mod protocol;
pub mod handlers;
pub mod http;
pub mod client;

pub use broker::{InMemoryBroker, MessageBroker};
pub use client::{QueueClient, candidates_message, results_message};
pub use handlers::broker_router;
pub use http::HttpBroker;
pub use types::*;
