pub mod batch;
pub mod estimate;
pub mod generate;
pub mod providers;

use anyhow::Result;
use spriteforge_pipeline::{AnimationKind, ArtStyle, GenerationSpec, SkeletonKind};
use std::path::{Path, PathBuf};

/// Shared flags for commands that describe one character.
#[derive(Debug, clap::Args)]
pub struct CharacterArgs {
    /// Character description
    pub prompt: String,

    /// Character name (derived from the prompt if omitted)
    #[arg(long)]
    pub name: Option<String>,

    /// Art style: pixel, cartoon, realistic, lowpoly
    #[arg(long, default_value = "pixel")]
    pub style: ArtStyle,

    /// Comma-separated animation kinds (idle, walk, run, attack, death)
    #[arg(long, default_value = "idle,walk", value_parser = parse_animations)]
    pub animations: std::vec::Vec<AnimationKind>,

    /// Rig skeleton: humanoid, quadruped, none
    #[arg(long, default_value = "humanoid")]
    pub skeleton: SkeletonKind,

    /// Output root directory
    #[arg(long, short, default_value = "out")]
    pub output: PathBuf,
}

impl CharacterArgs {
    pub fn to_spec(&self) -> GenerationSpec {
        let mut spec = GenerationSpec::new(&self.prompt, &self.output);
        spec.name = self.name.clone();
        spec.style = self.style;
        spec.animations = self.animations.clone();
        spec.skeleton = self.skeleton;
        // Each character gets its own directory under the output root.
        spec.output_dir = self.output.join(spec.resolved_name());
        spec
    }
}

pub fn parse_animations(s: &str) -> Result<Vec<AnimationKind>, String> {
    s.split(',')
        .map(|part| part.trim().parse::<AnimationKind>().map_err(|e| e.to_string()))
        .collect()
}

/// Provider overrides shared by generate and batch.
#[derive(Debug, clap::Args)]
pub struct ProviderArgs {
    /// Image provider: openai, stability, mock
    #[arg(long)]
    pub sprite_provider: Option<String>,

    /// Video provider: kling, mock
    #[arg(long)]
    pub animation_provider: Option<String>,

    /// Mesh+rig provider: meshy, mock
    #[arg(long)]
    pub model_provider: Option<String>,
}

pub fn load_config() -> Result<spriteforge_pipeline::ForgeConfig> {
    Ok(spriteforge_pipeline::ForgeConfig::load()?)
}

pub fn print_run_summary(run: &spriteforge_pipeline::PipelineRun) {
    println!("Run {} finished in {:.1}s", run.id, run.duration_secs);
    if let Some(sprite) = &run.sprite {
        println!("  Sprite:     {} ({})", sprite.artifact, sprite.provider);
    }
    for animation in &run.animations {
        println!("  Animation:  {} ({})", animation.artifact, animation.provider);
    }
    if let Some(model) = &run.model {
        let tag = if model.is_placeholder() {
            "placeholder"
        } else {
            model.provider.as_str()
        };
        println!("  Model:      {} ({})", model.artifact, tag);
    }
    if let Some(export) = &run.export {
        println!("  Bundle:     {}", export.artifact);
    }
    if let Some(error) = &run.error {
        println!("  Warnings:   {}", error);
    }
}

pub fn exists_or_bail(path: &Path, what: &str) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        anyhow::bail!("{} not found: {}", what, path.display())
    }
}
