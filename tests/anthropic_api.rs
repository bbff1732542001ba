//! Wire-level tests for the Anthropic Messages client against a mock server.

use coursesmith::model::{ChatMessage, ModelService, StopReason};
use coursesmith::providers::AnthropicClient;
use coursesmith::tools::ToolSchema;
use coursesmith::types::RagError;
use httpmock::prelude::*;
use serde_json::json;

fn search_schema() -> ToolSchema {
    ToolSchema {
        name: "search_course_content".into(),
        description: "Search".into(),
        input_schema: json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"]
        }),
    }
}

#[tokio::test]
async fn text_replies_map_to_end_turn() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/messages")
                .header("x-api-key", "test-key")
                .header("anthropic-version", "2023-06-01")
                .body_contains("search_course_content");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "content": [{"type": "text", "text": "RAG combines retrieval with generation."}],
                    "stop_reason": "end_turn"
                }));
        })
        .await;

    let client = AnthropicClient::new(server.base_url(), "test-key", "test-model");
    let reply = client
        .complete(
            "You are helpful.",
            &[ChatMessage::user("What is RAG?")],
            Some(&[search_schema()]),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(reply.stop_reason, StopReason::EndTurn);
    assert!(!reply.needs_tools());
    assert_eq!(reply.flat_text(), "RAG combines retrieval with generation.");
}

#[tokio::test]
async fn tool_use_replies_carry_requests() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "content": [{
                        "type": "tool_use",
                        "id": "toolu_123",
                        "name": "search_course_content",
                        "input": {"query": "What is RAG?", "lesson_number": 1}
                    }],
                    "stop_reason": "tool_use"
                }));
        })
        .await;

    let client = AnthropicClient::new(server.base_url(), "test-key", "test-model");
    let reply = client
        .complete("system", &[ChatMessage::user("q")], Some(&[search_schema()]))
        .await
        .unwrap();

    assert!(reply.needs_tools());
    let requests = reply.tool_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].id, "toolu_123");
    assert_eq!(requests[0].name, "search_course_content");
    assert_eq!(requests[0].input["lesson_number"], 1);
}

#[tokio::test]
async fn server_errors_become_model_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(529).body("overloaded");
        })
        .await;

    let client = AnthropicClient::new(server.base_url(), "test-key", "test-model");
    let err = client
        .complete("system", &[ChatMessage::user("q")], None)
        .await
        .unwrap_err();

    let RagError::Model(detail) = err else {
        panic!("expected a model error");
    };
    assert!(detail.contains("529"), "{detail}");
}

#[tokio::test]
async fn tool_schemas_are_omitted_when_none() {
    let server = MockServer::start_async().await;
    let with_tools = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/messages").body_contains("\"tools\"");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"content": [], "stop_reason": "end_turn"}));
        })
        .await;
    let without_tools = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "content": [{"type": "text", "text": "plain"}],
                    "stop_reason": "end_turn"
                }));
        })
        .await;

    let client = AnthropicClient::new(server.base_url(), "test-key", "test-model");
    let reply = client
        .complete("system", &[ChatMessage::user("q")], None)
        .await
        .unwrap();

    assert_eq!(with_tools.hits_async().await, 0, "no tools key on the wire");
    assert_eq!(without_tools.hits_async().await, 1);
    assert_eq!(reply.flat_text(), "plain");
}
