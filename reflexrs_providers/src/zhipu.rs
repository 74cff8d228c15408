use async_trait::async_trait;
use reflexrs_core::{ChatMessage, GenerateOptions, LLMProvider, LLMResponse, Role, Usage};
use reqwest::Client;
use serde_json::json;
use tracing::info;

use crate::retry::{RetryPolicy, retry_with_backoff};

const DEFAULT_MODEL: &str = "glm-4-flash";

pub struct ZhipuProvider {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl ZhipuProvider {
    pub fn new(api_key: String) -> Self {
        info!("Creating ZhipuProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://open.bigmodel.cn/api/paas/v4".to_string(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build_request(prompt: &str, options: &GenerateOptions) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = options.system_prompt.as_deref().filter(|s| !s.trim().is_empty()) {
            messages.push(ChatMessage {
                role: Role::System,
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: Role::User,
            content: prompt.to_string(),
        });

        let model = if options.model.is_empty() {
            DEFAULT_MODEL
        } else {
            options.model.as_str()
        };

        json!({
            "model": model,
            "messages": messages,
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
        })
    }

    fn parse_response(response: &serde_json::Value) -> anyhow::Result<LLMResponse> {
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing content"))?
            .to_string();

        let count = |u: &serde_json::Map<String, serde_json::Value>, key: &str| {
            u.get(key)
                .and_then(serde_json::Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0)
        };
        let usage = response["usage"].as_object().map(|u| Usage {
            prompt_tokens: count(u, "prompt_tokens"),
            completion_tokens: count(u, "completion_tokens"),
            total_tokens: count(u, "total_tokens"),
        });

        Ok(LLMResponse { content, usage })
    }

    /// Network failures, timeouts, 429 and 5xx are worth another attempt.
    fn is_transient(err: &anyhow::Error) -> bool {
        err.downcast_ref::<reqwest::Error>().is_some_and(|e| {
            e.is_timeout()
                || e.is_connect()
                || e.status()
                    .is_none_or(|s| s.is_server_error() || s.as_u16() == 429)
        })
    }

    async fn try_send(&self, request: &serde_json::Value) -> anyhow::Result<LLMResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        Self::parse_response(&response)
    }
}

#[async_trait]
impl LLMProvider for ZhipuProvider {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> anyhow::Result<LLMResponse> {
        let request = Self::build_request(prompt, options);
        info!("Sending request to Zhipu API: model={}", request["model"]);

        let response =
            retry_with_backoff(|| self.try_send(&request), &self.retry, Self::is_transient).await?;

        info!("Received response from Zhipu API");
        Ok(response)
    }

    fn get_default_model(&self) -> &'static str {
        DEFAULT_MODEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_includes_system_prompt_when_set() {
        let options = GenerateOptions {
            system_prompt: Some("be brief".to_string()),
            ..GenerateOptions::default()
        };
        let request = ZhipuProvider::build_request("hi", &options);
        assert_eq!(request["model"], "glm-4-flash");
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(request["messages"][1]["role"], "user");
        assert_eq!(request["messages"][1]["content"], "hi");
        assert_eq!(request["max_tokens"], 1024);
    }

    #[test]
    fn request_skips_blank_system_prompt() {
        let options = GenerateOptions {
            system_prompt: Some("  ".to_string()),
            ..GenerateOptions::default()
        };
        let request = ZhipuProvider::build_request("hi", &options);
        assert_eq!(request["messages"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn parses_content_and_usage() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        });
        let response = ZhipuProvider::parse_response(&body).unwrap();
        assert_eq!(response.content, "hello");
        assert_eq!(
            response.usage,
            Some(Usage {
                prompt_tokens: 3,
                completion_tokens: 1,
                total_tokens: 4
            })
        );
    }

    #[test]
    fn missing_content_is_an_error() {
        assert!(ZhipuProvider::parse_response(&json!({"choices": []})).is_err());
    }

    #[test]
    fn non_http_errors_are_permanent() {
        assert!(!ZhipuProvider::is_transient(&anyhow::anyhow!("bad json")));
    }
}
