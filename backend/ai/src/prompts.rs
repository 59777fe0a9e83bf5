use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use snapsolve_core::{AiConfig, AiError};

/// Longest input forwarded to a backend, in characters.
pub const MAX_INPUT_CHARS: usize = 2000;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert assistant answering questions that were captured \
from the screen with OCR. The text may contain recognition errors; use context to work out the intended \
question before answering.

- Start with the direct answer, then explain briefly.
- For math or other quantitative problems, show the work step by step.
- For multiple choice questions, name the correct option and say why it is right.
- If the text looks incomplete, state the assumption you made.
- Respond in the same language as the question.";

pub const DEFAULT_USER_PROMPT_TEMPLATE: &str = "Answer this question extracted from an image:

\"{text}\"

The text came from OCR and may contain recognition mistakes.";

/// A system/user prompt pair ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    /// The configured prompts with `text` filled in.
    ///
    /// Unset fields fall back to the defaults, or to the prompts for the
    /// detected content kind when `context_prompts` is on.
    pub fn for_config(text: &str, config: &AiConfig) -> Self {
        let fallback = if config.context_prompts {
            let (kind, pair) = generate_context_prompts(text);
            debug!(kind = kind.as_str(), "Using context prompts");
            pair
        } else {
            Self {
                system: DEFAULT_SYSTEM_PROMPT.to_string(),
                user: render_template(DEFAULT_USER_PROMPT_TEMPLATE, text),
            }
        };
        let system = config
            .system_prompt
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map_or(fallback.system, str::to_string);
        let user = config
            .user_prompt_template
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map_or(fallback.user, |template| render_template(template, text));
        Self { system, user }
    }

    /// System and user prompt joined, for backends without a system role.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

fn render_template(template: &str, text: &str) -> String {
    if template.contains("{text}") {
        template.replace("{text}", text)
    } else {
        format!("{template}\n\n{text}")
    }
}

/// What kind of content the recognized text looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Question,
    Math,
    Code,
    Error,
    Document,
    General,
}

static ARITHMETIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\s*[+\-*/]\s*\d+").unwrap());

impl ContextKind {
    /// First matching rule wins: question, math, code, error, long document.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["?", "what", "how", "why"]) {
            Self::Question
        } else if has(&["=", "solve", "calculate"]) || ARITHMETIC.is_match(&lower) {
            Self::Math
        } else if has(&["function", "def ", "class ", "import "]) {
            Self::Code
        } else if has(&["error", "exception", "failed", "bug"]) {
            Self::Error
        } else if text.chars().count() > 200 {
            Self::Document
        } else {
            Self::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Math => "math",
            Self::Code => "code",
            Self::Error => "error",
            Self::Document => "document",
            Self::General => "general",
        }
    }
}

/// Prompts tailored to the detected content kind.
pub fn generate_context_prompts(text: &str) -> (ContextKind, PromptPair) {
    let kind = ContextKind::classify(text);
    let (system, user) = match kind {
        ContextKind::Question => (
            "You are an expert assistant specializing in answering questions clearly and accurately. \
             Provide direct, helpful answers. Respond in the same language as the question.",
            format!("Please answer this question based on the extracted text: \"{text}\""),
        ),
        ContextKind::Math => (
            "You are a math tutor. Solve the problem step by step with clear explanations. \
             Respond in the same language as the problem.",
            format!("Please help solve this math problem: \"{text}\""),
        ),
        ContextKind::Code => (
            "You are a programming assistant. Explain, debug or improve the code with clear technical guidance.",
            format!("Please analyze this code and provide helpful insights: \"{text}\""),
        ),
        ContextKind::Error => (
            "You are a technical troubleshooting assistant. Diagnose the problem and suggest a fix.",
            format!("Please help diagnose and solve this technical issue: \"{text}\""),
        ),
        ContextKind::Document => (
            "You are a document analysis assistant. Summarize and extract the key insights.",
            format!("Please summarize and provide key insights from this text: \"{text}\""),
        ),
        ContextKind::General => (DEFAULT_SYSTEM_PROMPT, render_template(DEFAULT_USER_PROMPT_TEMPLATE, text)),
    };
    (
        kind,
        PromptPair {
            system: system.to_string(),
            user,
        },
    )
}

/// Collapse whitespace, reject empty input and cap the length.
pub fn validate_and_clean_text(text: &str) -> Result<String, AiError> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return Err(AiError::InvalidInput("no text to send".to_string()));
    }
    if cleaned.chars().count() > MAX_INPUT_CHARS {
        let mut truncated: String = cleaned.chars().take(MAX_INPUT_CHARS).collect();
        truncated.push_str("...");
        return Ok(truncated);
    }
    Ok(cleaned)
}
