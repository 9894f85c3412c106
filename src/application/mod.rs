//! # Application Layer
//!
//! Use cases coordinating domain rules with the upstream provider, the relay
//! endpoints and client-side storage.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
