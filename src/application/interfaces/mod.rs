mod completion_provider;
mod key_value_store;
mod relay_client;
mod submission_observer;

pub use completion_provider::*;
pub use key_value_store::*;
pub use relay_client::*;
pub use submission_observer::*;
