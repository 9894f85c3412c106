//! Pure request-handling rules shared by the relays and the client.

mod parameter_policy;
mod request_validator;
mod utf8_decoder;

pub use parameter_policy::*;
pub use request_validator::*;
pub use utf8_decoder::*;
