pub mod backends;
pub mod client;
pub mod diagnostics;
pub mod discovery;
pub mod http;
pub mod prompts;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_server;

pub use backends::{GeminiBackend, GroqBackend, HuggingFaceBackend, OllamaBackend, OpenAiCompatibleBackend};
pub use client::AiClient;
pub use diagnostics::{test_connection, ConnectionReport, CONNECTION_TEST_PROMPT};
pub use http::{with_backoff, RetryPolicy};
pub use prompts::{
    generate_context_prompts, validate_and_clean_text, ContextKind, PromptPair, DEFAULT_SYSTEM_PROMPT,
    DEFAULT_USER_PROMPT_TEMPLATE, MAX_INPUT_CHARS,
};
pub use registry::BackendRegistry;
