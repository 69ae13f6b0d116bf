//! Anthropic (Claude) provider adapter.

use async_trait::async_trait;
use std::time::Instant;

use super::{AnswerOutput, ModelInfo, ProviderAdapter, ReviewOutput};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicAdapter {
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicAdapter {
    pub fn new(api_key: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            api_key: api_key.into(),
            client,
        }
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        temperature: f64,
        max_tokens: u32,
        system_prompt: Option<&str>,
    ) -> Result<(String, Option<u32>, Option<u32>), String> {
        if self.api_key.is_empty() {
            return Err("Anthropic API key not configured".to_string());
        }

        let mut request_body = serde_json::json!({
            "model": model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": [{
                "role": "user",
                "content": prompt
            }]
        });
        if let Some(system) = system_prompt {
            request_body["system"] = serde_json::Value::String(system.to_string());
        }

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| format!("Anthropic request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Anthropic API error ({}): {}", status, body));
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("Anthropic response parse error: {}", e))?;

        let text = resp_json["content"][0]["text"]
            .as_str()
            .unwrap_or("")
            .to_string();
        let tokens_in = resp_json["usage"]["input_tokens"].as_u64().map(|t| t as u32);
        let tokens_out = resp_json["usage"]["output_tokens"]
            .as_u64()
            .map(|t| t as u32);

        Ok((text, tokens_in, tokens_out))
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn list_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo::new("claude-sonnet-4-5-20250929", "Claude Sonnet 4.5"),
            ModelInfo::new("claude-opus-4-20250514", "Claude Opus 4"),
            ModelInfo::new("claude-sonnet-4-20250514", "Claude Sonnet 4"),
            ModelInfo::new("claude-3-5-sonnet-20241022", "Claude 3.5 Sonnet"),
            ModelInfo::new("claude-3-5-haiku-20241022", "Claude 3.5 Haiku"),
        ]
    }

    async fn generate_answer(
        &self,
        model: &str,
        question: &str,
        temperature: f64,
        max_tokens: u32,
        system_prompt: Option<&str>,
    ) -> AnswerOutput {
        let start = Instant::now();
        match self
            .complete(model, question, temperature, max_tokens, system_prompt)
            .await
        {
            Ok((text, tokens_in, tokens_out)) => AnswerOutput {
                text,
                latency_ms: start.elapsed().as_millis() as u64,
                tokens_in,
                tokens_out,
                error: None,
            },
            Err(error) => AnswerOutput::failure(error, start.elapsed().as_millis() as u64),
        }
    }

    async fn generate_review(
        &self,
        model: &str,
        review_prompt: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> ReviewOutput {
        let start = Instant::now();
        match self
            .complete(model, review_prompt, temperature, max_tokens, None)
            .await
        {
            Ok((raw, _, _)) => ReviewOutput::from_raw(raw, start.elapsed().as_millis() as u64),
            Err(error) => ReviewOutput::failure(error, start.elapsed().as_millis() as u64),
        }
    }
}
