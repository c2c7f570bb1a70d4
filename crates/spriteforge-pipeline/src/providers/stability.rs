//! Stability AI image provider
//!
//! Second sprite provider behind the same trait as OpenAI, so the
//! coordinator can swap image backends by name alone. The API returns
//! the image inline as base64 rather than behind a result URL.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use spriteforge_core::{ContentHash, ForgeError, Result};
use std::path::Path;

use super::http;
use crate::config::ForgeConfig;
use crate::provider::{ProviderStatus, SpriteProvider, SpriteRequest, StageResult};

const DEFAULT_STABILITY_URL: &str =
    "https://api.stability.ai/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image";
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug)]
pub struct StabilityProvider {
    api_key: String,
    api_url: String,
}

impl StabilityProvider {
    pub fn from_config(config: &ForgeConfig) -> Result<Self> {
        let api_key = config
            .api_key("stability")
            .ok_or_else(|| ForgeError::CredentialMissing("stability".to_string()))?
            .to_string();

        let api_url = config
            .api_url("stability")
            .unwrap_or(DEFAULT_STABILITY_URL)
            .to_string();

        Ok(Self { api_key, api_url })
    }
}

impl SpriteProvider for StabilityProvider {
    fn name(&self) -> &str {
        "stability"
    }

    fn health_check(&self) -> Result<ProviderStatus> {
        if self.api_key.is_empty() {
            return Ok(ProviderStatus::NoApiKey);
        }
        Ok(ProviderStatus::Available)
    }

    fn generate(&self, request: &SpriteRequest, output_dir: &Path) -> Result<StageResult> {
        let prompt = request.style.enrich_prompt(&request.prompt);

        let payload = serde_json::json!({
            "text_prompts": [
                { "text": prompt, "weight": 1.0 },
                { "text": request.style.negative_prompt(), "weight": -1.0 }
            ],
            "width": request.size,
            "height": request.size,
            "samples": 1,
        });

        let auth = format!("Bearer {}", self.api_key);
        let response = http::post_json(
            self.name(),
            &self.api_url,
            ("Authorization", &auth),
            &payload,
            REQUEST_TIMEOUT_SECS,
        )?;

        let (encoded, seed) = parse_artifact_response(&response)?;
        let bytes = STANDARD.decode(&encoded).map_err(|e| {
            ForgeError::provider(self.name(), format!("Invalid base64 image data: {}", e))
        })?;

        std::fs::create_dir_all(output_dir)?;
        let output_path = output_dir.join(format!("{}.png", request.name));
        std::fs::write(&output_path, &bytes)?;

        let mut result = StageResult::new(output_path.to_string_lossy(), self.name())
            .with_metadata("prompt", prompt);
        result.content_hash = Some(ContentHash::from_bytes(&bytes).to_prefixed_hex());
        if let Some(seed) = seed {
            result = result.with_metadata("seed", seed.to_string());
        }
        Ok(result)
    }
}

/// Extract the base64 image and seed from a text-to-image response.
pub fn parse_artifact_response(response: &serde_json::Value) -> Result<(String, Option<u64>)> {
    let first = response
        .get("artifacts")
        .and_then(|a| a.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| {
            ForgeError::provider(
                "stability",
                format!(
                    "Unexpected response format: {}",
                    serde_json::to_string_pretty(response).unwrap_or_default()
                ),
            )
        })?;

    let encoded = first
        .get("base64")
        .and_then(|b| b.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ForgeError::provider("stability", "No image data in response"))?;

    let seed = first.get("seed").and_then(|s| s.as_u64());

    Ok((encoded, seed))
}
