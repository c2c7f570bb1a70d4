//! Character generation specs and the style/animation vocabulary

use serde::{Deserialize, Serialize};
use spriteforge_core::{derive_name, ForgeError, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Visual style applied to every stage's prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtStyle {
    Pixel,
    Cartoon,
    Realistic,
    LowPoly,
}

impl Default for ArtStyle {
    fn default() -> Self {
        ArtStyle::Pixel
    }
}

impl ArtStyle {
    pub fn prompt_prefix(&self) -> &'static str {
        match self {
            ArtStyle::Pixel => "16-bit pixel art game sprite",
            ArtStyle::Cartoon => "Colorful cartoon game character, bold outlines",
            ArtStyle::Realistic => "Realistic game character concept art",
            ArtStyle::LowPoly => "Low-poly stylized game character",
        }
    }

    pub fn prompt_suffix(&self) -> &'static str {
        match self {
            ArtStyle::Pixel => "full body, facing camera, plain white background",
            ArtStyle::Cartoon => "full body, clean silhouette, plain white background",
            ArtStyle::Realistic => "full body, neutral pose, studio lighting, plain background",
            ArtStyle::LowPoly => "full body, T-pose friendly, plain white background",
        }
    }

    pub fn negative_prompt(&self) -> &'static str {
        match self {
            ArtStyle::Pixel => "photorealistic, blurry, cropped limbs",
            ArtStyle::Cartoon => "photorealistic, gritty, cropped limbs",
            ArtStyle::Realistic => "cartoon, pixelated, cropped limbs",
            ArtStyle::LowPoly => "high-detail textures, photorealistic, cropped limbs",
        }
    }

    /// Wrap a base prompt with this style's prefix and suffix.
    pub fn enrich_prompt(&self, base_prompt: &str) -> String {
        format!(
            "{}. {}. {}",
            self.prompt_prefix(),
            base_prompt,
            self.prompt_suffix()
        )
    }
}

impl fmt::Display for ArtStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtStyle::Pixel => write!(f, "pixel"),
            ArtStyle::Cartoon => write!(f, "cartoon"),
            ArtStyle::Realistic => write!(f, "realistic"),
            ArtStyle::LowPoly => write!(f, "lowpoly"),
        }
    }
}

impl FromStr for ArtStyle {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pixel" => Ok(ArtStyle::Pixel),
            "cartoon" => Ok(ArtStyle::Cartoon),
            "realistic" => Ok(ArtStyle::Realistic),
            "lowpoly" | "low-poly" => Ok(ArtStyle::LowPoly),
            _ => Err(ForgeError::Validation(format!(
                "Unknown style '{}'. Use: pixel, cartoon, realistic, lowpoly",
                s
            ))),
        }
    }
}

/// Animation loops the video stage can produce, one clip per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    Idle,
    Walk,
    Run,
    Attack,
    Death,
}

impl AnimationKind {
    /// Motion description sent to the video provider alongside the sprite.
    pub fn motion_prompt(&self) -> &'static str {
        match self {
            AnimationKind::Idle => "subtle idle breathing loop, feet planted, seamless loop",
            AnimationKind::Walk => "walk cycle in place, natural arm swing, seamless loop",
            AnimationKind::Run => "fast run cycle in place, dynamic lean, seamless loop",
            AnimationKind::Attack => "single melee attack swing, returns to rest pose",
            AnimationKind::Death => "collapse to the ground, settles motionless",
        }
    }
}

impl fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimationKind::Idle => write!(f, "idle"),
            AnimationKind::Walk => write!(f, "walk"),
            AnimationKind::Run => write!(f, "run"),
            AnimationKind::Attack => write!(f, "attack"),
            AnimationKind::Death => write!(f, "death"),
        }
    }
}

impl FromStr for AnimationKind {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(AnimationKind::Idle),
            "walk" => Ok(AnimationKind::Walk),
            "run" => Ok(AnimationKind::Run),
            "attack" => Ok(AnimationKind::Attack),
            "death" => Ok(AnimationKind::Death),
            _ => Err(ForgeError::Validation(format!(
                "Unknown animation '{}'. Use: idle, walk, run, attack, death",
                s
            ))),
        }
    }
}

/// Skeleton the rigging stage targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkeletonKind {
    Humanoid,
    Quadruped,
    /// Static mesh, no rig
    None,
}

impl Default for SkeletonKind {
    fn default() -> Self {
        SkeletonKind::Humanoid
    }
}

impl fmt::Display for SkeletonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkeletonKind::Humanoid => write!(f, "humanoid"),
            SkeletonKind::Quadruped => write!(f, "quadruped"),
            SkeletonKind::None => write!(f, "none"),
        }
    }
}

impl FromStr for SkeletonKind {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "humanoid" => Ok(SkeletonKind::Humanoid),
            "quadruped" => Ok(SkeletonKind::Quadruped),
            "none" => Ok(SkeletonKind::None),
            _ => Err(ForgeError::Validation(format!(
                "Unknown skeleton '{}'. Use: humanoid, quadruped, none",
                s
            ))),
        }
    }
}

fn default_animations() -> Vec<AnimationKind> {
    vec![AnimationKind::Idle, AnimationKind::Walk]
}

/// Input to one pipeline run. Immutable once the run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSpec {
    /// Explicit character name; derived from the prompt when absent
    #[serde(default)]
    pub name: Option<String>,
    /// Free-text character description
    pub prompt: String,
    #[serde(default)]
    pub style: ArtStyle,
    /// Requested animation loops, in order
    #[serde(default = "default_animations")]
    pub animations: Vec<AnimationKind>,
    #[serde(default)]
    pub skeleton: SkeletonKind,
    /// Directory all run artifacts and metadata land in
    pub output_dir: PathBuf,
}

impl GenerationSpec {
    pub fn new(prompt: &str, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            prompt: prompt.to_string(),
            style: ArtStyle::default(),
            animations: default_animations(),
            skeleton: SkeletonKind::default(),
            output_dir: output_dir.into(),
        }
    }

    /// The explicit name, or one derived deterministically from the prompt.
    pub fn resolved_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => derive_name(&self.prompt),
        }
    }

    /// Requested animation kinds with duplicates removed, order preserved.
    /// Keeps the video result count bounded by the distinct kinds requested.
    pub fn distinct_animations(&self) -> Vec<AnimationKind> {
        let mut seen = Vec::with_capacity(self.animations.len());
        for kind in &self.animations {
            if !seen.contains(kind) {
                seen.push(*kind);
            }
        }
        seen
    }

    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(ForgeError::Validation(
                "Generation spec has an empty prompt".to_string(),
            ));
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ForgeError::Validation(
                    "Generation spec has an empty name".to_string(),
                ));
            }
        }
        Ok(())
    }
}
