//! Conversations and the chat exchange.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Local;
use serde_json::json;
use tracing::info;
use utoipa::OpenApi;

use crate::assistant;
use crate::commands::{self, CommandContext};
use crate::entities::{
    ConversationRecord, ConversationStore, MessageRecord, MessageStore, NewMessage, Role,
};
use crate::error::ServerError;
use crate::extract::{ApiJson, ApiPath};
use crate::routes::required_text;
use crate::schemas::MessageBody;
use crate::schemas::conversation::{
    ConversationDetail, ConversationResponse, CreateConversationRequest, ExchangeResponse,
    MessageResponse, SendMessageRequest, UpdateTitleRequest,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_conversations,
        create_conversation,
        get_conversation,
        delete_conversation,
        update_title,
        send_message
    ),
    components(schemas(
        CreateConversationRequest,
        UpdateTitleRequest,
        SendMessageRequest,
        ConversationResponse,
        ConversationDetail,
        MessageResponse,
        ExchangeResponse,
        MessageBody
    ))
)]
pub struct ConversationsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversations", get(list_conversations).post(create_conversation))
        .route("/conversations/{id}", get(get_conversation).delete(delete_conversation))
        .route("/conversations/{id}/title", put(update_title))
        .route("/conversations/{id}/messages", post(send_message))
}

async fn find_conversation(state: &AppState, id: i64) -> Result<ConversationRecord, ServerError> {
    state
        .store
        .get_conversation(id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Conversation {id} not found")))
}

#[utoipa::path(
    get,
    path = "/api/conversations",
    tag = "conversations",
    responses(
        (status = 200, description = "Conversations, most recently active first", body = Vec<ConversationResponse>),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ConversationResponse>>, ServerError> {
    let conversations = state.store.list_conversations().await?;
    Ok(Json(conversations.iter().map(ConversationRecord::to_response).collect()))
}

#[utoipa::path(
    post,
    path = "/api/conversations",
    tag = "conversations",
    request_body = CreateConversationRequest,
    responses(
        (status = 201, description = "Conversation created", body = ConversationResponse),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<ConversationResponse>), ServerError> {
    // An absent body is the same as `{}`.
    let req: CreateConversationRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateConversationRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ServerError::BadRequest(format!("Invalid JSON body: {e}")))?
    };
    let title = req
        .title
        .unwrap_or_else(|| format!("Conversation {}", Local::now().format("%Y-%m-%d %H:%M")));
    let conversation = state.store.create_conversation(&title).await?;
    info!(conversation_id = conversation.id, "conversation created");
    Ok((StatusCode::CREATED, Json(conversation.to_response())))
}

#[utoipa::path(
    get,
    path = "/api/conversations/{id}",
    tag = "conversations",
    params(("id" = i64, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Conversation with its messages, oldest first", body = ConversationDetail),
        (status = 404, description = "No such conversation"),
    )
)]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ConversationDetail>, ServerError> {
    let conversation = find_conversation(&state, id).await?;
    let messages = state.store.list_messages(id).await?;
    Ok(Json(ConversationDetail {
        conversation: conversation.to_response(),
        messages: messages.iter().map(MessageRecord::to_response).collect(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/conversations/{id}",
    tag = "conversations",
    params(("id" = i64, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Conversation and its messages deleted", body = MessageBody),
        (status = 404, description = "No such conversation"),
    )
)]
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageBody>, ServerError> {
    if !state.store.delete_conversation(id).await? {
        return Err(ServerError::NotFound(format!("Conversation {id} not found")));
    }
    info!(conversation_id = id, "conversation deleted");
    Ok(Json(MessageBody::new("Conversation deleted successfully")))
}

#[utoipa::path(
    put,
    path = "/api/conversations/{id}/title",
    tag = "conversations",
    params(("id" = i64, Path, description = "Conversation id")),
    request_body = UpdateTitleRequest,
    responses(
        (status = 200, description = "Conversation renamed", body = ConversationResponse),
        (status = 400, description = "Missing title"),
        (status = 404, description = "No such conversation"),
    )
)]
pub async fn update_title(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateTitleRequest>,
) -> Result<Json<ConversationResponse>, ServerError> {
    let title = required_text(req.title, "Title is required")?;
    let conversation = state
        .store
        .rename_conversation(id, &title)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Conversation {id} not found")))?;
    Ok(Json(conversation.to_response()))
}

/// Post a user message and store the assistant's answer.
///
/// The reply is produced first; both messages are then stored in one
/// transaction, so a failure leaves the conversation unchanged. Slash commands are answered locally; everything else goes to the hosted
/// LLM, or to a placeholder when none is configured or the call fails.
#[utoipa::path(
    post,
    path = "/api/conversations/{id}/messages",
    tag = "conversations",
    params(("id" = i64, Path, description = "Conversation id")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "User message and assistant reply", body = ExchangeResponse),
        (status = 400, description = "Missing or blank content"),
        (status = 404, description = "No such conversation"),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<(StatusCode, Json<ExchangeResponse>), ServerError> {
    find_conversation(&state, id).await?;
    let content = required_text(req.content, "Message content is required")?;

    let (reply, metadata) = if commands::is_command(&content) {
        let ctx = CommandContext {
            history: state.history.as_ref(),
            model: state.llm(),
            now: Local::now().naive_local(),
        };
        let output = commands::route_command(&content, ctx).await;
        (output.text, json!({ "command": output.name }))
    } else {
        let reply =
            assistant::generate_reply(state.store.as_ref(), state.llm(), &state.config, id, &content)
                .await?;
        let model = state.llm.as_ref().map_or(state.config.model.as_str(), |m| m.model_name());
        (reply, json!({ "model": model }))
    };

    let (user_message, assistant_message) = state
        .store
        .append_exchange(
            NewMessage {
                conversation_id: id,
                role: Role::User,
                content,
                metadata: req.metadata.unwrap_or_else(|| json!({})),
            },
            NewMessage {
                conversation_id: id,
                role: Role::Assistant,
                content: reply,
                metadata,
            },
        )
        .await?;
    info!(
        conversation_id = id,
        user_message_id = user_message.id,
        assistant_message_id = assistant_message.id,
        "chat exchange stored"
    );

    Ok((
        StatusCode::CREATED,
        Json(ExchangeResponse {
            user_message: user_message.to_response(),
            assistant_message: assistant_message.to_response(),
        }),
    ))
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::json;

    use crate::assistant::testing::StubModel;
    use crate::assistant::{FAILED_REPLY, NOT_CONFIGURED_REPLY};
    use crate::routes::testing::{TestApp, send};

    async fn new_conversation(app: &TestApp) -> i64 {
        let (status, body) =
            send(&app.router, "POST", "/api/conversations", Some(json!({ "title": "chat" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_i64().unwrap_or_else(|| panic!("no id in {body}"))
    }

    #[tokio::test]
    async fn default_title_is_timestamped() {
        let app = TestApp::new().await;
        let (status, body) = send(&app.router, "POST", "/api/conversations", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["title"].as_str().unwrap().starts_with("Conversation 20"));
        assert_eq!(body["message_count"], 0);
    }

    #[tokio::test]
    async fn unconfigured_exchange_stores_user_then_placeholder() {
        let app = TestApp::new().await;
        let id = new_conversation(&app).await;
        let uri = format!("/api/conversations/{id}/messages");

        let (status, body) =
            send(&app.router, "POST", &uri, Some(json!({ "content": "hello there" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user_message"]["role"], "user");
        assert_eq!(body["user_message"]["content"], "hello there");
        assert_eq!(body["user_message"]["metadata"], json!({}));
        assert_eq!(body["assistant_message"]["role"], "assistant");
        assert_eq!(body["assistant_message"]["content"], NOT_CONFIGURED_REPLY);

        let (_, detail) = send(&app.router, "GET", &format!("/api/conversations/{id}"), None).await;
        let messages = detail["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert!(messages.iter().all(|m| m["conversation_id"] == id));
        assert_eq!(detail["conversation"]["message_count"], 2);
    }

    #[tokio::test]
    async fn configured_exchange_records_model() {
        let model = Arc::new(StubModel::replying("Hi! How can I help?"));
        let app = TestApp::with_model(model.clone()).await;
        let id = new_conversation(&app).await;

        let (_, body) = send(
            &app.router,
            "POST",
            &format!("/api/conversations/{id}/messages"),
            Some(json!({ "content": "hello", "metadata": { "client": "web" } })),
        )
        .await;
        assert_eq!(body["user_message"]["metadata"]["client"], "web");
        assert_eq!(body["assistant_message"]["content"], "Hi! How can I help?");
        assert_eq!(body["assistant_message"]["metadata"]["model"], "stub-model");

        let request = model.last_request().unwrap();
        assert_eq!(request.messages.last().map(|m| m.content.as_str()), Some("hello"));
    }

    #[tokio::test]
    async fn failing_model_degrades_to_placeholder() {
        let app = TestApp::with_model(Arc::new(StubModel::failing())).await;
        let id = new_conversation(&app).await;
        let (status, body) = send(
            &app.router,
            "POST",
            &format!("/api/conversations/{id}/messages"),
            Some(json!({ "content": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["assistant_message"]["content"], FAILED_REPLY);
    }

    #[tokio::test]
    async fn slash_commands_are_answered_locally() {
        let app = TestApp::new().await;
        let id = new_conversation(&app).await;
        let (_, body) = send(
            &app.router,
            "POST",
            &format!("/api/conversations/{id}/messages"),
            Some(json!({ "content": "/weather" })),
        )
        .await;
        assert_eq!(body["assistant_message"]["metadata"]["command"], "weather");
        assert!(body["assistant_message"]["content"].as_str().unwrap().starts_with("Unknown command: /weather"));
    }

    #[tokio::test]
    async fn message_validation_and_missing_conversation() {
        let app = TestApp::new().await;
        let id = new_conversation(&app).await;

        let (status, body) = send(
            &app.router,
            "POST",
            &format!("/api/conversations/{id}/messages"),
            Some(json!({ "content": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message content is required");

        let (status, _) = send(
            &app.router,
            "POST",
            "/api/conversations/9999/messages",
            Some(json!({ "content": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_removes_messages() {
        let app = TestApp::new().await;
        let id = new_conversation(&app).await;
        let uri = format!("/api/conversations/{id}/messages");
        for text in ["one", "two"] {
            send(&app.router, "POST", &uri, Some(json!({ "content": text }))).await;
        }

        let (status, body) = send(&app.router, "DELETE", &format!("/api/conversations/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Conversation deleted successfully");

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE conversation_id = ?1")
            .bind(id)
            .fetch_one(app.store.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);

        let (status, _) = send(&app.router, "GET", &format!("/api/conversations/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn store_failure_leaves_no_half_exchange() {
        let app = TestApp::with_model(Arc::new(StubModel::replying("unused"))).await;
        let id = new_conversation(&app).await;
        let (status, _) = send(
            &app.router,
            "POST",
            "/api/data-sources",
            Some(json!({ "name": "Weather", "type": "api" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        sqlx::query("DROP TABLE contexts").execute(app.store.pool()).await.unwrap();

        let (status, body) = send(
            &app.router,
            "POST",
            &format!("/api/conversations/{id}/messages"),
            Some(json!({ "content": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");

        let (_, detail) = send(&app.router, "GET", &format!("/api/conversations/{id}"), None).await;
        assert_eq!(detail["messages"], json!([]));
        assert_eq!(detail["conversation"]["message_count"], 0);
    }

    #[tokio::test]
    async fn rename_requires_title() {
        let app = TestApp::new().await;
        let id = new_conversation(&app).await;
        let uri = format!("/api/conversations/{id}/title");

        let (status, _) = send(&app.router, "PUT", &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app.router, "PUT", &uri, Some(json!({ "title": "Renamed" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Renamed");
    }
}
