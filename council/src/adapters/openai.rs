//! OpenAI provider adapter.
//!
//! Request shape varies by model family: o1/o3 reasoning models reject
//! `temperature` and system messages and take `max_completion_tokens`, the
//! gpt-4.1/gpt-5 families take `max_completion_tokens` with a normal
//! `temperature`, and older chat models still use `max_tokens`.

use async_trait::async_trait;
use std::time::Instant;

use super::{AnswerOutput, ModelInfo, ProviderAdapter, ReviewOutput};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiAdapter {
    api_key: String,
    client: reqwest::Client,
}

fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("o1") || model.starts_with("o3")
}

fn uses_completion_tokens_field(model: &str) -> bool {
    is_reasoning_model(model) || model.starts_with("gpt-4.1") || model.starts_with("gpt-5")
}

fn build_request_body(
    model: &str,
    prompt: &str,
    temperature: f64,
    max_tokens: u32,
    system_prompt: Option<&str>,
) -> serde_json::Value {
    let mut messages = Vec::new();
    if let Some(system) = system_prompt {
        if !is_reasoning_model(model) {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
    }
    messages.push(serde_json::json!({"role": "user", "content": prompt}));

    let mut request_body = serde_json::json!({
        "model": model,
        "messages": messages
    });
    if uses_completion_tokens_field(model) {
        request_body["max_completion_tokens"] = serde_json::json!(max_tokens);
    } else {
        request_body["max_tokens"] = serde_json::json!(max_tokens);
    }
    if !is_reasoning_model(model) {
        request_body["temperature"] = serde_json::json!(temperature);
    }

    request_body
}

impl OpenAiAdapter {
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
            return Err("OpenAI API key not configured".to_string());
        }

        let request_body = build_request_body(model, prompt, temperature, max_tokens, system_prompt);

        let response = self
            .client
            .post(API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| format!("OpenAI request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("OpenAI API error ({}): {}", status, body));
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("OpenAI response parse error: {}", e))?;

        let text = resp_json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();
        let tokens_in = resp_json["usage"]["prompt_tokens"].as_u64().map(|t| t as u32);
        let tokens_out = resp_json["usage"]["completion_tokens"]
            .as_u64()
            .map(|t| t as u32);

        Ok((text, tokens_in, tokens_out))
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn list_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo::new("gpt-5.2", "GPT-5.2"),
            ModelInfo::new("gpt-5.2-pro", "GPT-5.2 Pro"),
            ModelInfo::new("gpt-5.1", "GPT-5.1"),
            ModelInfo::new("gpt-5-pro", "GPT-5 Pro"),
            ModelInfo::new("gpt-5-mini", "GPT-5 Mini"),
            ModelInfo::new("gpt-5-nano", "GPT-5 Nano"),
            ModelInfo::new("gpt-4.1", "GPT-4.1"),
            ModelInfo::new("gpt-4.1-mini", "GPT-4.1 Mini"),
            ModelInfo::new("gpt-4.1-nano", "GPT-4.1 Nano"),
            ModelInfo::new("gpt-4o", "GPT-4o"),
            ModelInfo::new("gpt-4o-mini", "GPT-4o Mini"),
            ModelInfo::new("o3", "o3"),
            ModelInfo::new("o3-mini", "o3 Mini"),
            ModelInfo::new("o1", "o1"),
            ModelInfo::new("o1-mini", "o1 Mini"),
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
