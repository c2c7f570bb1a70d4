//! Per-stage provider traits and request/result types
//!
//! Each generation stage gets its own capability trait so same-stage
//! providers expose an identical call signature and the coordinator can
//! swap them by name without branching on provider identity. Clients are
//! deliberately thin: one outbound call, one artifact write, typed
//! failures. Retry, rate limiting, and fallback live outside.

use serde::{Deserialize, Serialize};
use spriteforge_core::{ForgeError, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::character::{AnimationKind, ArtStyle, SkeletonKind};

/// The four pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Sprite,
    Animation,
    Model,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Sprite => write!(f, "sprite"),
            Stage::Animation => write!(f, "animation"),
            Stage::Model => write!(f, "model"),
            Stage::Export => write!(f, "export"),
        }
    }
}

/// Output of one stage call: the artifact it produced and where it came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Path (or URL, for unfetched artifacts) of the produced artifact
    pub artifact: String,
    /// Provider that produced it; `"placeholder"` for soft-fail stand-ins
    pub provider: String,
    /// Content hash of the artifact file (sha256:...)
    #[serde(default)]
    pub content_hash: Option<String>,
    /// Provider-specific metadata (revised prompt, seed, remote task ids)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StageResult {
    pub const PLACEHOLDER_PROVIDER: &'static str = "placeholder";

    pub fn new(artifact: impl Into<String>, provider: &str) -> Self {
        Self {
            artifact: artifact.into(),
            provider: provider.to_string(),
            content_hash: None,
            metadata: HashMap::new(),
        }
    }

    /// A locally synthesized stand-in for a soft-failed stage.
    pub fn placeholder(artifact: impl Into<String>) -> Self {
        Self::new(artifact, Self::PLACEHOLDER_PROVIDER)
    }

    pub fn is_placeholder(&self) -> bool {
        self.provider == Self::PLACEHOLDER_PROVIDER
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Status returned by a provider health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Available,
    Unavailable(String),
    NoApiKey,
}

/// Request for the image stage: prompt + style -> one sprite file
#[derive(Debug, Clone)]
pub struct SpriteRequest {
    pub name: String,
    pub prompt: String,
    pub style: ArtStyle,
    /// Square output resolution in pixels
    pub size: u32,
}

/// Request for the video stage: sprite + animation kind -> one clip
#[derive(Debug, Clone)]
pub struct AnimationRequest {
    pub name: String,
    pub sprite_path: PathBuf,
    pub kind: AnimationKind,
    pub style: ArtStyle,
    /// Target clip length in seconds
    pub duration_secs: u32,
}

/// Request for the mesh+rig stage: sprite + skeleton -> one rigged model
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub name: String,
    pub sprite_path: PathBuf,
    pub prompt: String,
    pub style: ArtStyle,
    pub skeleton: SkeletonKind,
}

pub trait SpriteProvider: Send + Sync {
    fn name(&self) -> &str;
    fn health_check(&self) -> Result<ProviderStatus>;
    fn generate(&self, request: &SpriteRequest, output_dir: &Path) -> Result<StageResult>;
}

pub trait AnimationProvider: Send + Sync {
    fn name(&self) -> &str;
    fn health_check(&self) -> Result<ProviderStatus>;
    fn animate(&self, request: &AnimationRequest, output_dir: &Path) -> Result<StageResult>;
}

pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;
    fn health_check(&self) -> Result<ProviderStatus>;
    fn generate_rigged(&self, request: &ModelRequest, output_dir: &Path) -> Result<StageResult>;
}

/// Stage precondition: the artifact a stage builds on must already exist.
pub(crate) fn ensure_source_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ForgeError::Validation(format!(
            "Required source artifact missing: {}",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_marker() {
        let result = StageResult::placeholder("out/knight_rigged.glb");
        assert!(result.is_placeholder());
        assert_eq!(result.provider, "placeholder");

        let real = StageResult::new("out/knight.png", "openai");
        assert!(!real.is_placeholder());
    }

    #[test]
    fn test_stage_result_json_roundtrip() {
        let result = StageResult::new("out/knight.png", "openai")
            .with_metadata("revised_prompt", "a knight in armor");
        let json = serde_json::to_string(&result).unwrap();
        let back: StageResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.artifact, "out/knight.png");
        assert_eq!(back.metadata.get("revised_prompt").unwrap(), "a knight in armor");
    }

    #[test]
    fn test_ensure_source_exists_rejects_missing() {
        let err = ensure_source_exists(Path::new("/nonexistent/sprite.png")).unwrap_err();
        assert!(!err.is_retryable());
    }
}
