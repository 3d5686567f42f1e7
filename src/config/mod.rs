//! Configuration Module
//!
//! Typed property files of the four processes. Every file is JSON with the kebab-case
//! keys operators already use, and is validated when it is loaded: a bad property stops
//! the process before any socket is opened.
//!
//! ## Submodules
//! - **`types`**: Property structs and `ConfigError`.
//! - **`loader`**: `load_json` and the per-file `load`/`validate`.

pub mod types;
pub mod loader;

pub use loader::load_json;
pub use types::*;

#[cfg(test)]
mod tests;
