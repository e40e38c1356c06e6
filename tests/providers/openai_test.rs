//! OpenAI wire format tests.

use adbrain::providers::openai::{build_request, parse_response};
use adbrain::providers::{CompletionRequest, Message, ProviderError, Role};

#[test]
fn build_request_puts_system_first_and_asks_for_json() {
    let request = CompletionRequest {
        messages: vec![Message::user("{\"userAccountId\":\"u1\"}")],
        system: Some("You are an ad operator.".to_owned()),
        max_tokens: None,
        temperature: Some(0.0),
        json_response: true,
    };

    let wire = build_request("gpt-4.1", &request);
    assert_eq!(wire.model, "gpt-4.1");
    assert_eq!(wire.messages.len(), 2);
    assert_eq!(wire.messages[0].role, "system");
    assert_eq!(wire.messages[0].content, "You are an ad operator.");
    assert_eq!(wire.messages[1].role, "user");
    assert!(wire.max_tokens.is_some());

    let body = serde_json::to_value(&wire).expect("request should serialize");
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(body["temperature"], 0.0);
}

#[test]
fn build_request_omits_unset_optionals() {
    let request = CompletionRequest {
        messages: vec![
            Message::user("hi"),
            Message {
                role: Role::Assistant,
                content: "hello".to_owned(),
            },
        ],
        system: None,
        max_tokens: Some(64),
        temperature: None,
        json_response: false,
    };

    let body = serde_json::to_value(build_request("m", &request)).expect("serialize");
    assert!(body.get("response_format").is_none());
    assert!(body.get("temperature").is_none());
    assert_eq!(body["max_tokens"], 64);
    assert_eq!(body["messages"][1]["role"], "assistant");
}

#[test]
fn parse_response_reads_first_choice_and_usage() {
    let body = r#"{
        "model": "gpt-4.1-2025",
        "choices": [
            {"message": {"content": "{\"planNote\":\"ok\",\"actions\":[]}"}},
            {"message": {"content": "ignored"}}
        ],
        "usage": {"prompt_tokens": 120, "completion_tokens": 30}
    }"#;

    let response = parse_response(body).expect("response should parse");
    assert_eq!(response.text, "{\"planNote\":\"ok\",\"actions\":[]}");
    assert_eq!(response.model, "gpt-4.1-2025");
    assert_eq!(response.usage.input_tokens, 120);
    assert_eq!(response.usage.output_tokens, 30);
}

#[test]
fn parse_response_tolerates_missing_usage_and_content() {
    let body = r#"{"model": "m", "choices": [{"message": {"content": null}}]}"#;
    let response = parse_response(body).expect("response should parse");
    assert_eq!(response.text, "");
    assert_eq!(response.usage.input_tokens, 0);
}

#[test]
fn parse_response_rejects_empty_choices() {
    let result = parse_response(r#"{"model": "m", "choices": []}"#);
    assert!(matches!(result, Err(ProviderError::Parse(_))));

    let garbage = parse_response("not json");
    assert!(matches!(garbage, Err(ProviderError::Parse(_))));
}
