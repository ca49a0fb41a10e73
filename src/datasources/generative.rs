use crate::config::GeneratorBackendConfig;
use crate::datasources::{GenerationOptions, GenerativeBackend};
use crate::error::{FarmWatchError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Client for a Gemini-style generative text API.
pub struct HttpGenerativeBackend {
    name: String,
    client: reqwest::Client,
    config: GeneratorBackendConfig,
}

impl HttpGenerativeBackend {
    pub fn new(name: &str, config: GeneratorBackendConfig) -> Self {
        Self {
            name: name.to_string(),
            client: reqwest::Client::new(),
            config,
        }
    }

    fn request_body(&self, prompt: &str, opts: &GenerationOptions) -> Value {
        let mut generation_config = json!({
            "maxOutputTokens": opts.max_tokens,
            "temperature": opts.temperature,
        });
        if !opts.thinking_enabled {
            generation_config["thinkingConfig"] = json!({ "thinkingBudget": 0 });
        }

        json!({
            "model": self.config.model,
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        })
    }
}

#[async_trait]
impl GenerativeBackend for HttpGenerativeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str, opts: &GenerationOptions) -> Result<String> {
        let response = self
            .client
            .post(&self.config.url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&self.request_body(prompt, opts))
            .send()
            .await
            .map_err(|e| {
                FarmWatchError::DataSourceUnavailable(format!("{} backend: {}", self.name, e))
            })?;

        if !response.status().is_success() {
            return Err(FarmWatchError::DataSourceUnavailable(format!(
                "{} backend returned {}",
                self.name,
                response.status()
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            FarmWatchError::DataSourceUnavailable(format!(
                "{} backend response: {}",
                self.name, e
            ))
        })?;

        Ok(extract_response_text(&body))
    }
}

/// Pull generated text out of a backend response.
///
/// Providers disagree on response shape, so three strategies run in order:
/// a plain top-level text field, concatenating candidate parts while
/// skipping internal-reasoning parts, then a permissive regex scrape over
/// the raw JSON. Only when all three come up empty is the result empty.
pub fn extract_response_text(body: &Value) -> String {
    // 1. Simple top-level field
    for key in ["text", "output_text"] {
        if let Some(text) = body.get(key).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                return text.trim().to_string();
            }
        }
    }

    // 2. Candidate parts, skipping reasoning parts
    if let Some(parts) = body
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
    {
        let text: String = parts
            .iter()
            .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("");
        if !text.trim().is_empty() {
            return text.trim().to_string();
        }
    }

    // 3. Permissive scrape over the raw payload
    let raw = body.to_string();
    let re = regex_lite::Regex::new(r#""text"\s*:\s*"([^"]+)""#).unwrap();
    let scraped: String = re
        .captures_iter(&raw)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    scraped.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_top_level_text_field() {
        let body = json!({ "text": "Water your maize early." });
        assert_eq!(extract_response_text(&body), "Water your maize early.");

        let body = json!({ "output_text": "Add lime to the soil." });
        assert_eq!(extract_response_text(&body), "Add lime to the soil.");
    }

    #[test]
    fn concatenates_parts_and_skips_reasoning() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "internal chain of reasoning", "thought": true },
                        { "text": "Apply lime " },
                        { "text": "before the next rains." }
                    ]
                }
            }]
        });
        assert_eq!(
            extract_response_text(&body),
            "Apply lime before the next rains."
        );
    }

    #[test]
    fn falls_back_to_regex_scrape() {
        // Unfamiliar shape: no top-level field, no candidates path
        let body = json!({
            "outputs": [{ "message": { "text": "Mulch your beds today." } }]
        });
        assert_eq!(extract_response_text(&body), "Mulch your beds today.");
    }

    #[test]
    fn empty_when_all_strategies_fail() {
        let body = json!({ "status": "ok", "usage": { "tokens": 10 } });
        assert_eq!(extract_response_text(&body), "");
    }

    #[test]
    fn top_level_field_wins_over_parts() {
        let body = json!({
            "text": "top level",
            "candidates": [{ "content": { "parts": [{ "text": "nested" }] } }]
        });
        assert_eq!(extract_response_text(&body), "top level");
    }

    #[test]
    fn request_body_disables_thinking_by_default() {
        let backend = HttpGenerativeBackend::new(
            "primary",
            GeneratorBackendConfig {
                url: "https://example.invalid/v1/generate".to_string(),
                api_key: "test".to_string(),
                model: "test-model".to_string(),
            },
        );
        let body = backend.request_body("hi", &GenerationOptions::default());
        assert_eq!(
            body.pointer("/generationConfig/thinkingConfig/thinkingBudget"),
            Some(&json!(0))
        );

        let thinking = GenerationOptions {
            thinking_enabled: true,
            ..GenerationOptions::default()
        };
        let body = backend.request_body("hi", &thinking);
        assert!(body.pointer("/generationConfig/thinkingConfig").is_none());
    }
}
