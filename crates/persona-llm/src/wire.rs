use serde_json::{json, Value};

use persona_core::completion::CompletionRequest;
use persona_core::errors::CompletionError;
use persona_core::ids::ToolCallId;
use persona_core::messages::{AssistantMessage, Message, ToolCallBlock};

/// Convert a completion request into the chat-completions request body.
pub fn build_request_body(request: &CompletionRequest, model: &str) -> Value {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);

    if !request.system.is_empty() {
        messages.push(json!({"role": "system", "content": request.system}));
    }
    for m in &request.messages {
        messages.push(convert_message(m));
    }

    let mut body = json!({
        "model": model,
        "messages": messages,
    });

    if let Some(temp) = request.temperature {
        body["temperature"] = json!(temp);
    }
    if let Some(max) = request.max_tokens {
        body["max_tokens"] = json!(max);
    }

    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters_schema,
                    }
                })
            })
            .collect();
        body["tools"] = json!(tools);
        body["tool_choice"] = json!("auto");
    }

    body
}

fn convert_message(message: &Message) -> Value {
    match message {
        Message::User(m) => json!({"role": "user", "content": m.content}),
        Message::Assistant(m) => {
            let mut val = json!({"role": "assistant", "content": m.content});
            if !m.tool_calls.is_empty() {
                let calls: Vec<Value> = m
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        json!({
                            "id": tc.id.as_str(),
                            "type": "function",
                            "function": {
                                "name": tc.name,
                                // The wire format carries arguments as a JSON string.
                                "arguments": tc.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
                val["tool_calls"] = json!(calls);
            }
            val
        }
        Message::Tool(m) => json!({
            "role": "tool",
            "tool_call_id": m.tool_call_id.as_str(),
            "content": m.content,
        }),
    }
}

/// Parse a chat-completions response body into an assistant message.
pub fn parse_response_body(body: &Value) -> Result<AssistantMessage, CompletionError> {
    let message = body["choices"]
        .get(0)
        .map(|c| &c["message"])
        .ok_or_else(|| CompletionError::MalformedResponse("no choices in response".into()))?;

    let content = message["content"].as_str().unwrap_or_default().to_string();

    let mut tool_calls = Vec::new();
    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let id = call["id"]
                .as_str()
                .ok_or_else(|| CompletionError::MalformedResponse("tool call without id".into()))?;
            let name = call["function"]["name"].as_str().ok_or_else(|| {
                CompletionError::MalformedResponse("tool call without function name".into())
            })?;
            let raw_args = call["function"]["arguments"].as_str().unwrap_or("{}");
            let arguments: Value = serde_json::from_str(raw_args).map_err(|e| {
                CompletionError::MalformedResponse(format!(
                    "unparseable tool arguments for {name}: {e}"
                ))
            })?;

            tool_calls.push(ToolCallBlock {
                id: ToolCallId::from_raw(id),
                name: name.to_string(),
                arguments,
            });
        }
    }

    Ok(AssistantMessage::with_tool_calls(content, tool_calls))
}
