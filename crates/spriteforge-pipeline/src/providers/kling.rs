//! Kling image-to-video provider (via fal.ai)
//!
//! Animates the generated sprite into a short looping clip, one call per
//! animation kind. The source frame travels inline as a data URI so the
//! endpoint never needs access to local files.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use spriteforge_core::{ContentHash, ForgeError, Result};
use std::path::Path;

use super::http;
use crate::config::ForgeConfig;
use crate::provider::{
    ensure_source_exists, AnimationProvider, AnimationRequest, ProviderStatus, StageResult,
};

const DEFAULT_KLING_URL: &str = "https://fal.run/fal-ai/kling-video/v1.6/standard/image-to-video";
const REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug)]
pub struct KlingProvider {
    api_key: String,
    api_url: String,
}

impl KlingProvider {
    pub fn from_config(config: &ForgeConfig) -> Result<Self> {
        let api_key = config
            .api_key("kling")
            .ok_or_else(|| ForgeError::CredentialMissing("kling".to_string()))?
            .to_string();

        let api_url = config
            .api_url("kling")
            .unwrap_or(DEFAULT_KLING_URL)
            .to_string();

        Ok(Self { api_key, api_url })
    }
}

impl AnimationProvider for KlingProvider {
    fn name(&self) -> &str {
        "kling"
    }

    fn health_check(&self) -> Result<ProviderStatus> {
        if self.api_key.is_empty() {
            return Ok(ProviderStatus::NoApiKey);
        }
        Ok(ProviderStatus::Available)
    }

    fn animate(&self, request: &AnimationRequest, output_dir: &Path) -> Result<StageResult> {
        ensure_source_exists(&request.sprite_path)?;
        let sprite_bytes = std::fs::read(&request.sprite_path)?;
        let image_url = format!("data:image/png;base64,{}", STANDARD.encode(&sprite_bytes));

        let motion = format!(
            "{}, {} style, seamless loop",
            request.kind.motion_prompt(),
            request.style
        );

        let payload = serde_json::json!({
            "prompt": motion,
            "image_url": image_url,
            "duration": request.duration_secs.to_string(),
        });

        let auth = format!("Key {}", self.api_key);
        let response = http::post_json(
            self.name(),
            &self.api_url,
            ("Authorization", &auth),
            &payload,
            REQUEST_TIMEOUT_SECS,
        )?;

        let video_url = parse_video_response(&response)?;

        std::fs::create_dir_all(output_dir)?;
        let output_path = output_dir.join(format!("{}_{}.mp4", request.name, request.kind));
        let bytes = http::get_bytes(self.name(), &video_url, REQUEST_TIMEOUT_SECS)?;
        std::fs::write(&output_path, &bytes)?;

        let mut result = StageResult::new(output_path.to_string_lossy(), self.name())
            .with_metadata("animation", request.kind.to_string())
            .with_metadata("motion_prompt", motion);
        result.content_hash = Some(ContentHash::from_bytes(&bytes).to_prefixed_hex());
        Ok(result)
    }
}

/// Extract the result video URL from an image-to-video response.
pub fn parse_video_response(response: &serde_json::Value) -> Result<String> {
    response
        .get("video")
        .and_then(|v| v.get("url"))
        .and_then(|u| u.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            ForgeError::provider(
                "kling",
                format!(
                    "Unexpected response format: {}",
                    serde_json::to_string_pretty(response).unwrap_or_default()
                ),
            )
        })
}
