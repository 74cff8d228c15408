#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::module_name_repetitions
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod matching;
pub mod pattern;
pub mod reflex;
pub mod repository;
pub mod types;

pub use config::{CacheConfig, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use matching::{Branch, MatchOptions, MatchResult, match_one, match_patterns};
pub use pattern::{GLOBAL_SPACE, Pattern, ValidationError};
pub use reflex::{ReflexConfig, ReflexLoop, Reply, ReplySource};
pub use repository::{NoteRepo, PatternFilter, PatternRepo, SpaceRepo};
pub use types::{Note, Space};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            model: "glm-4-flash".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            system_prompt: None,
        }
    }
}

/// Text generation used when no stored pattern answers the input.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(&self, prompt: &str, options: &GenerateOptions)
    -> anyhow::Result<LLMResponse>;

    fn get_default_model(&self) -> &str;
}

#[async_trait]
impl<T> LLMProvider for std::sync::Arc<T>
where
    T: LLMProvider + ?Sized,
{
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> anyhow::Result<LLMResponse> {
        (**self).generate(prompt, options).await
    }

    fn get_default_model(&self) -> &str {
        (**self).get_default_model()
    }
}
