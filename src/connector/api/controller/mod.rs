pub mod completion_controller;
pub mod stream_controller;

pub use completion_controller::{complete, COMPLETION_FAILED};
pub use stream_controller::{stream, STREAM_FAILED};
