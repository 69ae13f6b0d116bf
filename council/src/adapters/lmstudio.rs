//! LM Studio provider adapter.
//!
//! Talks to a local LM Studio server over its OpenAI-compatible API. Unlike
//! the cloud adapters the model list is live (whatever the server has
//! loaded), so listings are fetched from the server and cached briefly.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{AnswerOutput, ModelInfo, ProviderAdapter, ReviewOutput};

const MODEL_CACHE_TTL: Duration = Duration::from_secs(60);

/// Hard cap on review generations against local servers.
const REVIEW_MAX_TOKENS_CAP: u32 = 2048;

pub struct LmStudioAdapter {
    base_url: String,
    client: reqwest::Client,
    model_cache: Mutex<Option<(Instant, Vec<ModelInfo>)>>,
}

impl LmStudioAdapter {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            model_cache: Mutex::new(None),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn fetch_models(&self) -> Result<Vec<ModelInfo>, String> {
        let response = self
            .client
            .get(self.endpoint("/v1/models"))
            .send()
            .await
            .map_err(|e| format!("LM Studio request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("LM Studio API error ({}): {}", status, body));
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("LM Studio response parse error: {}", e))?;

        let models = resp_json["data"]
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry["id"].as_str())
                    .map(|id| ModelInfo::new(id, id))
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        temperature: f64,
        max_tokens: u32,
        system_prompt: Option<&str>,
    ) -> Result<(String, Option<u32>, Option<u32>), String> {
        if self.base_url.is_empty() {
            return Err("LM Studio base URL not configured".to_string());
        }

        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": prompt}));

        let request_body = serde_json::json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens
        });

        let response = self
            .client
            .post(self.endpoint("/v1/chat/completions"))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| format!("LM Studio request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("LM Studio API error ({}): {}", status, body));
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("LM Studio response parse error: {}", e))?;

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
impl ProviderAdapter for LmStudioAdapter {
    fn name(&self) -> &'static str {
        "lmstudio"
    }

    fn is_available(&self) -> bool {
        !self.base_url.is_empty()
    }

    async fn list_models(&self) -> Vec<ModelInfo> {
        if self.base_url.is_empty() {
            return Vec::new();
        }

        if let Ok(guard) = self.model_cache.lock() {
            if let Some((fetched_at, models)) = guard.as_ref() {
                if fetched_at.elapsed() < MODEL_CACHE_TTL {
                    return models.clone();
                }
            }
        }

        match self.fetch_models().await {
            Ok(models) => {
                if let Ok(mut guard) = self.model_cache.lock() {
                    *guard = Some((Instant::now(), models.clone()));
                }
                models
            }
            Err(error) => {
                tracing::warn!(%error, "LM Studio model listing failed");
                Vec::new()
            }
        }
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
        let max_tokens = max_tokens.min(REVIEW_MAX_TOKENS_CAP);
        match self
            .complete(model, review_prompt, temperature, max_tokens, None)
            .await
        {
            Ok((raw, _, _)) => ReviewOutput::from_raw(raw, start.elapsed().as_millis() as u64),
            Err(error) => ReviewOutput::failure(error, start.elapsed().as_millis() as u64),
        }
    }
}
