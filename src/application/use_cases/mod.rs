mod complete_chat;
mod conversation_session;
mod stream_chat;

pub use complete_chat::*;
pub use conversation_session::*;
pub use stream_chat::*;
