//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Upstream completion providers (OpenAI, echoing mock)
//! - The HTTP relay client used by the terminal client
//! - Preference storage (file, in-memory)
//! - The axum HTTP API

pub mod adapter;
pub mod api;
pub mod storage;

pub use adapter::*;
pub use api::*;
pub use storage::*;
