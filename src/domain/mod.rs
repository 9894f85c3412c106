//! # Domain Layer
//!
//! Request/response models, conversation state and the pure rules applied
//! to them (validation, parameter policy, transcript building).
//! This layer is independent of HTTP frameworks and upstream vendors.

mod error;
pub mod models;
pub mod services;

pub use error::*;
pub use models::*;
pub use services::*;
