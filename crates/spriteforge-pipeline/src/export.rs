//! Web-ready bundle export
//!
//! Copies every surviving artifact of a run into a `bundle/` directory
//! with a `bundle.json` manifest describing what is inside and where it
//! came from. Placeholder artifacts are included and tagged so a
//! consumer can tell real output from stand-ins.

use serde::{Deserialize, Serialize};
use spriteforge_core::{ForgeError, Result};
use std::path::{Path, PathBuf};

use crate::provider::StageResult;
use crate::run::{now_iso8601, PipelineRun};

pub const BUNDLE_DIR: &str = "bundle";
pub const BUNDLE_MANIFEST: &str = "bundle.json";

/// One artifact inside a bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleEntry {
    /// What the artifact is for ("sprite", "animation:walk", "model")
    pub role: String,
    /// Path relative to the bundle root
    pub file: String,
    pub provider: String,
    #[serde(default)]
    pub content_hash: Option<String>,
}

/// Manifest written alongside the bundled files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    pub name: String,
    pub generated_at: String,
    pub entries: Vec<BundleEntry>,
}

impl BundleManifest {
    pub fn load(bundle_dir: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(bundle_dir.join(BUNDLE_MANIFEST))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Copy a run's artifacts into `<output_dir>/bundle/` and write the
/// manifest. Requires at least the sprite to exist.
pub fn package_bundle(run: &PipelineRun) -> Result<StageResult> {
    let sprite = run.sprite.as_ref().ok_or_else(|| {
        ForgeError::Validation("Cannot export a run with no sprite artifact".to_string())
    })?;

    let bundle_dir = run.spec.output_dir.join(BUNDLE_DIR);
    std::fs::create_dir_all(&bundle_dir)?;

    let mut entries = Vec::new();
    entries.push(copy_into(sprite, "sprite", &bundle_dir, None)?);

    if !run.animations.is_empty() {
        let anim_dir = bundle_dir.join("animations");
        std::fs::create_dir_all(&anim_dir)?;
        for animation in &run.animations {
            let role = match animation.metadata.get("animation") {
                Some(kind) => format!("animation:{}", kind),
                None => "animation".to_string(),
            };
            entries.push(copy_into(animation, &role, &bundle_dir, Some("animations"))?);
        }
    }

    if let Some(model) = &run.model {
        entries.push(copy_into(model, "model", &bundle_dir, None)?);
    }

    let manifest = BundleManifest {
        name: run.spec.resolved_name(),
        generated_at: now_iso8601(),
        entries,
    };

    let manifest_path = bundle_dir.join(BUNDLE_MANIFEST);
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

    Ok(StageResult::new(bundle_dir.to_string_lossy(), "local")
        .with_metadata("artifact_count", manifest.entries.len().to_string()))
}

fn copy_into(
    result: &StageResult,
    role: &str,
    bundle_dir: &Path,
    subdir: Option<&str>,
) -> Result<BundleEntry> {
    let source = PathBuf::from(&result.artifact);
    let file_name = source
        .file_name()
        .ok_or_else(|| {
            ForgeError::Validation(format!("Artifact has no file name: {}", result.artifact))
        })?
        .to_string_lossy()
        .to_string();

    let relative = match subdir {
        Some(sub) => format!("{}/{}", sub, file_name),
        None => file_name,
    };
    std::fs::copy(&source, bundle_dir.join(&relative))?;

    Ok(BundleEntry {
        role: role.to_string(),
        file: relative,
        provider: result.provider.clone(),
        content_hash: result.content_hash.clone(),
    })
}
