mod chat_message;
mod completion;
mod conversation;
mod stream;
mod tool;

pub use chat_message::*;
pub use completion::*;
pub use conversation::*;
pub use stream::*;
pub use tool::*;
