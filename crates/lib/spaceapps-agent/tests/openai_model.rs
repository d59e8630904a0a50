use serde_json::json;
use spaceapps_agent::{AgentError, ChatMessage, ChatModel, OpenAiChatModel, OpenAiSettings};
use spaceapps_types::ToolDescriptor;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn model(server: &MockServer, api_key: Option<&str>) -> OpenAiChatModel {
    OpenAiChatModel::new(OpenAiSettings {
        base_url: format!("{}/v1", server.uri()),
        api_key: api_key.map(str::to_string),
        model: "gpt-4o-mini".to_string(),
        timeout: None,
    })
    .expect("model")
}

fn search_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: "search_elastic_index".to_string(),
        description: Some("Search an index".to_string()),
        input_schema: json!({"type": "object", "properties": {"index": {"type": "string"}}}),
    }
}

#[tokio::test]
async fn tool_calls_are_parsed_from_the_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0,
            "tools": [{"type": "function", "function": {"name": "search_elastic_index"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "search_elastic_index",
                            "arguments": "{\"index\":\"readings\",\"query\":{\"match_all\":{}}}"
                        }
                    }]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let completion = model(&server, Some("sk-test"))
        .complete(&[ChatMessage::user("search readings")], &[search_tool()])
        .await
        .expect("completion");

    assert!(completion.content.is_none());
    assert_eq!(completion.finish_reason.as_deref(), Some("tool_calls"));
    assert_eq!(completion.tool_calls.len(), 1);
    assert_eq!(completion.tool_calls[0].id, "call_1");
    assert_eq!(
        completion.tool_calls[0].arguments,
        json!({"index": "readings", "query": {"match_all": {}}})
    );
}

#[tokio::test]
async fn error_statuses_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = model(&server, Some("wrong"))
        .complete(&[ChatMessage::user("hi")], &[])
        .await
        .expect_err("unauthorized");
    assert!(matches!(err, AgentError::Authentication(message) if message == "invalid api key"));
}

#[tokio::test]
async fn empty_choices_are_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = model(&server, None)
        .complete(&[ChatMessage::user("hi")], &[])
        .await
        .expect_err("no choices");
    assert!(matches!(err, AgentError::InvalidResponse(_)));
}
