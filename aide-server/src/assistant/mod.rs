//! Hosted LLM integration.
//!
//! [`ChatModel`] is the seam between the chat endpoint and the provider; the
//! production implementation is [`anthropic::AnthropicClient`]. A missing
//! model (no API key) or a failed call never fails the request: the reply
//! degrades to one of the fixed placeholders below.

pub mod anthropic;
pub mod prompt;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Config;
use crate::entities::{DataSourceStore, MessageStore, Role};
use crate::error::ServerError;

/// Reply stored when no API key is configured.
pub const NOT_CONFIGURED_REPLY: &str = "⚠️ AI Assistant not configured. Please set ANTHROPIC_API_KEY \
     environment variable to enable AI responses. For now, I'm a placeholder response!";

/// Reply stored when the hosted LLM call fails.
pub const FAILED_REPLY: &str =
    "⚠️ Sorry, I couldn't reach the AI service just now. Please try again in a moment.";

/// How many recent contexts of each enabled data source go into the preamble.
const CONTEXTS_PER_SOURCE: u32 = 5;

/// One turn of prompt history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

/// A single non-streaming completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<PromptMessage>,
    pub max_tokens: u32,
}

/// Text-generation backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier recorded in message metadata.
    fn model_name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> anyhow::Result<String>;
}

/// Produce the assistant reply to `pending`, a user message of
/// `conversation_id` that has not been stored yet.
///
/// The prompt is the stored tail of the conversation followed by `pending`,
/// `history_window` turns in all. Store failures propagate, model failures
/// do not.
pub async fn generate_reply<S>(
    store: &S,
    model: Option<&dyn ChatModel>,
    config: &Config,
    conversation_id: i64,
    pending: &str,
) -> Result<String, ServerError>
where
    S: MessageStore + DataSourceStore,
{
    let Some(model) = model else {
        return Ok(NOT_CONFIGURED_REPLY.to_owned());
    };

    let stored = config.history_window.saturating_sub(1);
    let history = store.recent_messages(conversation_id, stored).await?;

    let sources = store.list_data_sources(true).await?;
    let mut with_contexts = Vec::with_capacity(sources.len());
    for source in sources {
        let contexts = store.list_contexts(source.id, Some(CONTEXTS_PER_SOURCE)).await?;
        with_contexts.push((source, contexts));
    }

    let mut turns = prompt::to_turns(&history);
    prompt::push_turn(&mut turns, Role::User, pending);

    let request = CompletionRequest {
        system: Some(prompt::system_prompt(&with_contexts)),
        messages: turns,
        max_tokens: config.max_tokens,
    };

    match model.complete(request).await {
        Ok(text) => {
            info!(conversation_id, output_len = text.len(), "assistant reply generated");
            Ok(text)
        }
        Err(e) => {
            warn!(conversation_id, error = ?e, "hosted LLM call failed; using placeholder reply");
            Ok(FAILED_REPLY.to_owned())
        }
    }
}


#[cfg(test)]
mod test {
    use super::testing::StubModel;
    use super::*;
    use crate::entities::{ConversationStore, NewContext, NewDataSource, NewMessage, memory_store};
    use serde_json::json;

    #[tokio::test]
    async fn missing_model_yields_placeholder() {
        let store = memory_store().await;
        let conv = store.create_conversation("c").await.unwrap();
        let reply = generate_reply(&store, None, &Config::default(), conv.id, "hi").await.unwrap();
        assert_eq!(reply, NOT_CONFIGURED_REPLY);
    }

    #[tokio::test]
    async fn failing_model_yields_fixed_placeholder() {
        let store = memory_store().await;
        let conv = store.create_conversation("c").await.unwrap();
        let model = StubModel::failing();
        let reply = generate_reply(&store, Some(&model), &Config::default(), conv.id, "hi")
            .await
            .unwrap();
        assert_eq!(reply, FAILED_REPLY);
    }

    #[tokio::test]
    async fn request_carries_window_and_context() {
        let store = memory_store().await;
        let conv = store.create_conversation("c").await.unwrap();
        for i in 0..4 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store
                .append_message(NewMessage {
                    conversation_id: conv.id,
                    role,
                    content: format!("turn {i}"),
                    metadata: json!({}),
                })
                .await
                .unwrap();
        }

        let ds = store
            .create_data_source(NewDataSource {
                name: "Weather".into(),
                source_type: "api".into(),
                enabled: true,
                config: json!({}),
            })
            .await
            .unwrap();
        store
            .add_context(NewContext {
                data_source_id: ds.id,
                content: "Sunny, 22C".into(),
                summary: None,
                expires_at: None,
            })
            .await
            .unwrap();

        let config = Config { history_window: 3, ..Config::default() };
        let model = StubModel::replying("hello");
        let reply = generate_reply(&store, Some(&model), &config, conv.id, "latest").await.unwrap();
        assert_eq!(reply, "hello");

        let request = model.last_request().unwrap();
        let contents: Vec<&str> = request.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["turn 2", "turn 3", "latest"]);
        assert_eq!(store.list_messages(conv.id).await.unwrap().len(), 4);
        let system = request.system.unwrap();
        assert!(system.contains("Available data sources: Weather"));
        assert!(system.contains("Sunny, 22C"));
        assert_eq!(request.max_tokens, config.max_tokens);
    }
}
