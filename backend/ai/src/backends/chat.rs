//! OpenAI-style chat completions, shared by Groq and OpenAI-compatible servers.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use snapsolve_core::{AiConfig, AiError, ProviderKind};

use crate::http::{fetch_json, send_json, RetryPolicy};
use crate::prompts::PromptPair;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

pub(crate) struct ChatCall<'a> {
    pub provider: ProviderKind,
    pub base_url: &'a str,
    pub api_key: &'a str,
    pub model: &'a str,
}

pub(crate) async fn complete(
    client: &Client,
    retry: &RetryPolicy,
    call: ChatCall<'_>,
    prompts: &PromptPair,
    config: &AiConfig,
) -> Result<String, AiError> {
    let body = ChatRequest {
        model: call.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: &prompts.system,
            },
            ChatMessage {
                role: "user",
                content: &prompts.user,
            },
        ],
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    };
    let url = format!("{}/chat/completions", call.base_url);

    let response: ChatResponse = send_json(retry, call.provider, || {
        client.post(&url).bearer_auth(call.api_key).json(&body)
    })
    .await?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AiError::protocol(call.provider, "response has no choices[0].message.content"))
}

pub(crate) async fn list_models(
    client: &Client,
    provider: ProviderKind,
    base_url: &str,
    api_key: &str,
) -> Result<Vec<String>, AiError> {
    let list: ModelList = fetch_json(
        provider,
        client.get(format!("{base_url}/models")).bearer_auth(api_key),
    )
    .await?;
    Ok(list.data.into_iter().map(|m| m.id).collect())
}
