use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How upstream completion deltas are re-batched before emission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkMode {
    /// Relay every non-empty delta as it arrives
    #[default]
    Token,
    /// Flush once the buffer holds `chunk_size` characters
    Chars,
    /// Flush on sentence or paragraph boundaries, or at the flush threshold
    Paragraph,
}

impl ChunkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkMode::Token => "token",
            ChunkMode::Chars => "chars",
            ChunkMode::Paragraph => "paragraph",
        }
    }
}

impl fmt::Display for ChunkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "token" => Ok(ChunkMode::Token),
            "chars" => Ok(ChunkMode::Chars),
            "paragraph" => Ok(ChunkMode::Paragraph),
            other => Err(format!(
                "Unsupported chunk mode: {}. Expected token, chars or paragraph",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub model: String,
    pub system_prompt: String,
    /// Ignored by reasoning models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl LLMConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            system_prompt: "You are a helpful assistant.".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}
