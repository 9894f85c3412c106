use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::application::CompletionProvider;
use crate::domain::{ChatCompletionCall, CompletionRequest, CompletionResult, DomainError};

/// Single-shot relay: one upstream call, the full answer returned as one value.
pub struct CompleteChatUseCase {
    provider: Arc<dyn CompletionProvider>,
}

impl CompleteChatUseCase {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub async fn execute(&self, request: CompletionRequest) -> Result<CompletionResult, DomainError> {
        self.provider.ensure_credential()?;

        let call = ChatCompletionCall {
            model: request.model.clone(),
            messages: request.input.to_chat_messages(),
            temperature: request.temperature,
        };

        info!(
            "Completion via {}: model={} temperature={} messages={}",
            self.provider.name(),
            call.model,
            call.temperature,
            call.messages.len()
        );
        let start_time = Instant::now();

        let completion = self.provider.complete(&call).await.map_err(|e| {
            error!("Completion failed for model {}: {}", call.model, e);
            e
        })?;

        info!("Completion finished in {:.2}s", start_time.elapsed().as_secs_f64());

        Ok(CompletionResult {
            text: completion.text.unwrap_or_default(),
            model: request.model,
            temperature: request.temperature,
            usage: completion.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::MockCompletionProvider;
    use crate::domain::{ChatMessage, RequestValidator, SYSTEM_PROMPT};
    use serde_json::json;

    fn request(body: serde_json::Value) -> CompletionRequest {
        RequestValidator::validate(&body).unwrap()
    }

    #[tokio::test]
    async fn prompt_becomes_system_plus_user() {
        let provider = MockCompletionProvider::new().with_completion_text("hi").into_shared();
        let use_case = CompleteChatUseCase::new(provider.clone());

        let result = use_case.execute(request(json!({"prompt": "P"}))).await.unwrap();

        assert_eq!(result.text, "hi");
        assert_eq!(result.model, "gpt-4o-mini");
        assert_eq!(result.temperature, 0.7);
        assert_eq!(result.total_tokens(), Some(2));

        let call = provider.last_completion_call().await.unwrap();
        assert_eq!(
            call.messages,
            vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user("P")]
        );
    }

    #[tokio::test]
    async fn applies_policy_to_upstream_call() {
        let provider = MockCompletionProvider::new().into_shared();
        let use_case = CompleteChatUseCase::new(provider.clone());

        let result = use_case
            .execute(request(json!({"prompt": "P", "model": "gpt-5", "temperature": 0})))
            .await
            .unwrap();

        assert_eq!(result.temperature, 1.0);
        let call = provider.last_completion_call().await.unwrap();
        assert_eq!(call.model, "gpt-5");
        assert_eq!(call.temperature, 1.0);
    }

    #[tokio::test]
    async fn missing_credential_makes_no_upstream_call() {
        let provider = MockCompletionProvider::new().without_credential().into_shared();
        let use_case = CompleteChatUseCase::new(provider.clone());

        let err = use_case.execute(request(json!({"prompt": "P"}))).await.unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(provider.upstream_calls(), 0);
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let provider = MockCompletionProvider::new()
            .failing_completion("connection reset")
            .into_shared();
        let use_case = CompleteChatUseCase::new(provider);

        let err = use_case.execute(request(json!({"prompt": "P"}))).await.unwrap_err();
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn missing_text_is_empty_string() {
        struct Silent;

        #[async_trait::async_trait]
        impl CompletionProvider for Silent {
            fn ensure_credential(&self) -> Result<(), DomainError> {
                Ok(())
            }

            async fn complete(
                &self,
                _call: &ChatCompletionCall,
            ) -> Result<crate::domain::UpstreamCompletion, DomainError> {
                Ok(Default::default())
            }

            async fn open_stream(
                &self,
                _call: &crate::domain::StreamingCall,
            ) -> Result<crate::application::UpstreamEventStream, DomainError> {
                Err(DomainError::internal("unused"))
            }

            fn name(&self) -> &str {
                "silent"
            }
        }

        let use_case = CompleteChatUseCase::new(Arc::new(Silent));
        let result = use_case.execute(request(json!({"prompt": "P"}))).await.unwrap();
        assert_eq!(result.text, "");
        assert!(result.usage.is_none());
    }
}
