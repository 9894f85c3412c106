pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use application::{
    CompleteChatUseCase, CompletionProvider, CompletionStream, ConversationSession,
    KeyValueStore, RelayClient, RelayStream, SilentObserver, StreamChatUseCase,
    SubmissionObserver, SubmissionOutcome,
};

pub use cli::{ChatRepl, Commands, ReplCommand};

pub use connector::{
    ApiError, Container, ContainerConfig, FileKeyValueStore, HttpRelayClient,
    InMemoryKeyValueStore, MockCompletionProvider, OpenAiClient, Router,
};

pub use domain::{
    ChatMessage, CompletionPayload, CompletionRequest, CompletionResult, ConversationAction,
    ConversationState, DomainError, ParameterPolicy, Preferences, RequestValidator, Role,
    StreamMetadata, StreamPayload, ToolChoice, ToolKind,
};
