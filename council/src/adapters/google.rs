//! Google (Gemini) provider adapter.

use async_trait::async_trait;
use std::time::Instant;

use super::{AnswerOutput, ModelInfo, ProviderAdapter, ReviewOutput};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GoogleAdapter {
    api_key: String,
    client: reqwest::Client,
}

impl GoogleAdapter {
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
            return Err("Google API key not configured".to_string());
        }

        let mut request_body = serde_json::json!({
            "contents": [{
                "parts": [{
                    "text": prompt
                }]
            }],
            "generationConfig": {
                "temperature": temperature,
                "maxOutputTokens": max_tokens
            }
        });
        if let Some(system) = system_prompt {
            request_body["systemInstruction"] = serde_json::json!({
                "parts": [{
                    "text": system
                }]
            });
        }

        let url = format!("{}/{}:generateContent?key={}", API_BASE, model, self.api_key);

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| format!("Google request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Google API error ({}): {}", status, body));
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("Google response parse error: {}", e))?;

        let text = resp_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .to_string();
        let tokens_in = resp_json["usageMetadata"]["promptTokenCount"]
            .as_u64()
            .map(|t| t as u32);
        let tokens_out = resp_json["usageMetadata"]["candidatesTokenCount"]
            .as_u64()
            .map(|t| t as u32);

        Ok((text, tokens_in, tokens_out))
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn name(&self) -> &'static str {
        "google"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn list_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo::new("gemini-2.0-flash-exp", "Gemini 2.0 Flash"),
            ModelInfo::new("gemini-1.5-pro", "Gemini 1.5 Pro"),
            ModelInfo::new("gemini-1.5-flash", "Gemini 1.5 Flash"),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_reported_not_thrown() {
        let adapter = GoogleAdapter::new("", reqwest::Client::new());
        let output = adapter
            .generate_answer("gemini-1.5-flash", "hi", 0.7, 256, None)
            .await;

        assert!(!output.is_success());
        assert_eq!(output.error.as_deref(), Some("Google API key not configured"));
    }

    #[tokio::test]
    async fn test_model_listing() {
        let adapter = GoogleAdapter::new("key", reqwest::Client::new());
        let models = adapter.list_models().await;

        assert_eq!(models.len(), 3);
        assert!(models.iter().any(|m| m.id == "gemini-1.5-pro"));
    }
}
