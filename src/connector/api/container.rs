use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::{CompleteChatUseCase, CompletionProvider, StreamChatUseCase};
use crate::connector::adapter::{
    MockCompletionProvider, OpenAiClient, API_KEY_VAR, BASE_URL_VAR, DEFAULT_BASE_URL,
};

pub struct ContainerConfig {
    /// Upstream credential. Startup succeeds without one; requests then fail
    /// with a configuration error.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Serve from the echoing mock instead of the real upstream.
    pub mock_upstream: bool,
}

impl ContainerConfig {
    pub fn from_env(mock_upstream: bool) -> Self {
        Self {
            api_key: std::env::var(API_KEY_VAR).ok().filter(|key| !key.is_empty()),
            base_url: std::env::var(BASE_URL_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            mock_upstream,
        }
    }
}

impl std::fmt::Debug for ContainerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("mock_upstream", &self.mock_upstream)
            .finish()
    }
}

/// Wires the upstream provider to the use cases. Shared read-only by every
/// request handler.
pub struct Container {
    provider: Arc<dyn CompletionProvider>,
    config: ContainerConfig,
}

impl Container {
    pub fn new(config: ContainerConfig) -> Self {
        let provider: Arc<dyn CompletionProvider> = if config.mock_upstream {
            debug!("Using mock upstream");
            Arc::new(MockCompletionProvider::new())
        } else {
            if config.api_key.is_none() {
                warn!("{} is not set; completion requests will fail", API_KEY_VAR);
            }
            debug!("Using OpenAI upstream at {}", config.base_url);
            Arc::new(OpenAiClient::new(config.api_key.clone(), config.base_url.clone()))
        };

        Self { provider, config }
    }

    /// Build around an existing provider, e.g. a scripted mock in tests.
    pub fn with_provider(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            config: ContainerConfig {
                api_key: None,
                base_url: DEFAULT_BASE_URL.to_string(),
                mock_upstream: true,
            },
        }
    }

    pub fn complete_use_case(&self) -> CompleteChatUseCase {
        CompleteChatUseCase::new(self.provider.clone())
    }

    pub fn stream_use_case(&self) -> StreamChatUseCase {
        StreamChatUseCase::new(self.provider.clone())
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn mock_upstream(&self) -> bool {
        self.config.mock_upstream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_provider_from_config() {
        let mock = Container::new(ContainerConfig {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            mock_upstream: true,
        });
        assert_eq!(mock.provider_name(), "mock");

        let real = Container::new(ContainerConfig {
            api_key: Some("sk-test".to_string()),
            base_url: "http://localhost:9999".to_string(),
            mock_upstream: false,
        });
        assert_eq!(real.provider_name(), "openai");
        assert_eq!(real.base_url(), "http://localhost:9999");
    }

    #[test]
    fn debug_output_hides_key() {
        let config = ContainerConfig {
            api_key: Some("sk-secret".to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
            mock_upstream: false,
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
