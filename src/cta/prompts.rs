//! Prompts and output schema for label generation.

use serde::{Deserialize, Serialize};

use super::engine::{ChatMessage, ChatRequest, ResponseFormat};

/// Completion length limit for one label.
pub const MAX_TOKENS: u32 = 100;

/// Sampling temperature for label generation.
pub const TEMPERATURE: f32 = 0.7;

const MAX_TOPICS: usize = 3;

/// What the model is told about a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoContext {
    /// Repository name; also the cache key.
    pub name: String,
    /// Repository description.
    #[serde(default)]
    pub description: Option<String>,
    /// Primary language.
    #[serde(default)]
    pub language: Option<String>,
    /// Topic tags.
    #[serde(default)]
    pub topics: Vec<String>,
}

impl RepoContext {
    /// Repository with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// System prompt shared by every generation.
#[must_use]
pub fn system_prompt() -> &'static str {
    "You are an expert web developer who can generate short (4 words or less), punchy, \
     engaging CTA button labels for a GitHub repository based on its name, description, \
     language, and topics for people interested in my projects."
}

/// User prompt describing `repo`. Empty descriptions and languages are
/// replaced by placeholders; at most three topics are listed.
#[must_use]
pub fn user_prompt(repo: &RepoContext) -> String {
    let description = repo
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or("No description");
    let language = repo
        .language
        .as_deref()
        .filter(|l| !l.is_empty())
        .unwrap_or("Unknown");
    let topics = if repo.topics.is_empty() {
        String::new()
    } else {
        let listed: Vec<&str> = repo
            .topics
            .iter()
            .take(MAX_TOPICS)
            .map(String::as_str)
            .collect();
        format!("Topics: {}", listed.join(", "))
    };

    format!(
        "Generate a CTA button label for this GitHub repository:\n\n\
         Repository: {}\n\
         Description: {description}\n\
         Language: {language}\n\
         {topics}",
        repo.name
    )
    .trim()
    .to_string()
}

/// JSON schema the model output must follow.
#[must_use]
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "$id": "CTAResponse",
        "type": "object",
        "properties": {
            "cta": {
                "type": "string",
                "description": "A short call-to-action button label, maximum 5 words",
                "maxLength": 50
            },
            "reasoning": {
                "type": "string",
                "description": "Brief explanation of why this CTA was chosen"
            }
        },
        "required": ["cta"],
        "additionalProperties": false
    })
}

/// Streaming completion request for `repo`.
#[must_use]
pub fn build_request(repo: &RepoContext) -> ChatRequest {
    ChatRequest {
        messages: vec![
            ChatMessage::system(system_prompt()),
            ChatMessage::user(user_prompt(repo)),
        ],
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
        response_format: Some(ResponseFormat::json_object(&response_schema())),
    }
}
