//! OpenAI image provider (DALL-E 3)
//!
//! Generates the character sprite. The API returns a result URL plus a
//! revised prompt, which is carried through as stage metadata.

use spriteforge_core::{ContentHash, ForgeError, Result};
use std::path::Path;

use super::http;
use crate::config::ForgeConfig;
use crate::provider::{ProviderStatus, SpriteProvider, SpriteRequest, StageResult};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/images/generations";
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug)]
pub struct OpenAiProvider {
    api_key: String,
    api_url: String,
}

impl OpenAiProvider {
    pub fn from_config(config: &ForgeConfig) -> Result<Self> {
        let api_key = config
            .api_key("openai")
            .ok_or_else(|| ForgeError::CredentialMissing("openai".to_string()))?
            .to_string();

        let api_url = config
            .api_url("openai")
            .unwrap_or(DEFAULT_OPENAI_URL)
            .to_string();

        Ok(Self { api_key, api_url })
    }

    fn auth_header(&self) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.api_key))
    }
}

impl SpriteProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn health_check(&self) -> Result<ProviderStatus> {
        if self.api_key.is_empty() {
            return Ok(ProviderStatus::NoApiKey);
        }
        Ok(ProviderStatus::Available)
    }

    fn generate(&self, request: &SpriteRequest, output_dir: &Path) -> Result<StageResult> {
        let prompt = request.style.enrich_prompt(&request.prompt);
        let size = format!("{}x{}", request.size, request.size);

        let payload = serde_json::json!({
            "model": "dall-e-3",
            "prompt": prompt,
            "n": 1,
            "size": size,
        });

        let (header, value) = self.auth_header();
        let response = http::post_json(
            self.name(),
            &self.api_url,
            (header, &value),
            &payload,
            REQUEST_TIMEOUT_SECS,
        )?;

        let (image_url, revised_prompt) = parse_image_response(&response)?;

        std::fs::create_dir_all(output_dir)?;
        let output_path = output_dir.join(format!("{}.png", request.name));
        let bytes = http::get_bytes(self.name(), &image_url, REQUEST_TIMEOUT_SECS)?;
        std::fs::write(&output_path, &bytes)?;

        let mut result = StageResult::new(output_path.to_string_lossy(), self.name())
            .with_metadata("prompt", prompt);
        result.content_hash = Some(ContentHash::from_bytes(&bytes).to_prefixed_hex());
        if let Some(revised) = revised_prompt {
            result = result.with_metadata("revised_prompt", revised);
        }
        Ok(result)
    }
}

/// Extract the image URL and optional revised prompt from a generations response.
pub fn parse_image_response(response: &serde_json::Value) -> Result<(String, Option<String>)> {
    let first = response
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| {
            ForgeError::provider(
                "openai",
                format!(
                    "Unexpected response format: {}",
                    serde_json::to_string_pretty(response).unwrap_or_default()
                ),
            )
        })?;

    let url = first
        .get("url")
        .and_then(|u| u.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ForgeError::provider("openai", "No image URL in response"))?;

    let revised = first
        .get("revised_prompt")
        .and_then(|p| p.as_str())
        .map(|s| s.to_string());

    Ok((url, revised))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image_response() {
        let response: serde_json::Value = serde_json::from_str(
            r#"{
                "created": 1719500000,
                "data": [
                    {
                        "url": "https://example.com/sprite.png",
                        "revised_prompt": "A 16-bit pixel art knight in full armor"
                    }
                ]
            }"#,
        )
        .unwrap();

        let (url, revised) = parse_image_response(&response).unwrap();
        assert_eq!(url, "https://example.com/sprite.png");
        assert_eq!(
            revised.unwrap(),
            "A 16-bit pixel art knight in full armor"
        );
    }

    #[test]
    fn test_parse_image_response_without_revision() {
        let response: serde_json::Value =
            serde_json::from_str(r#"{"data": [{"url": "https://example.com/a.png"}]}"#).unwrap();
        let (url, revised) = parse_image_response(&response).unwrap();
        assert_eq!(url, "https://example.com/a.png");
        assert!(revised.is_none());
    }

    #[test]
    fn test_parse_image_response_error_body() {
        let response: serde_json::Value =
            serde_json::from_str(r#"{"error": {"message": "billing hard limit"}}"#).unwrap();
        assert!(parse_image_response(&response).is_err());
    }

    #[test]
    fn test_from_config_without_key_is_credential_missing() {
        let err = OpenAiProvider::from_config(&ForgeConfig::default()).unwrap_err();
        assert!(matches!(err, ForgeError::CredentialMissing(ref p) if p == "openai"));
    }
}
