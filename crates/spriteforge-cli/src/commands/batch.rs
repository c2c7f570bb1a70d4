//! `spriteforge batch` - many characters from one TOML file
//!
//! File format:
//!
//! ```toml
//! [batch]
//! concurrency = 2
//! continue_on_error = true
//!
//! [[characters]]
//! name = "knight"
//! prompt = "a brave knight with a tower shield"
//! style = "pixel"
//! animations = ["idle", "walk", "attack"]
//! skeleton = "humanoid"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use spriteforge_pipeline::cost::{estimate_batch, PricingTable, RunPlan};
use spriteforge_pipeline::{
    run_batch, AnimationKind, ArtStyle, BatchConfig, Clock, GenerationSpec, Pipeline,
    PipelineConfig, RateLimiter, SkeletonKind, SystemClock,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{exists_or_bail, load_config, ProviderArgs};

#[derive(Debug, clap::Args)]
pub struct BatchArgs {
    /// Path to the batch TOML file
    pub file: PathBuf,

    /// Output root directory; each character gets a subdirectory
    #[arg(long, short, default_value = "out")]
    pub output: PathBuf,

    #[command(flatten)]
    pub providers: ProviderArgs,

    /// Specs processed simultaneously (overrides the file)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Stop after the first failing chunk instead of finishing the batch
    #[arg(long)]
    pub fail_fast: bool,

    /// Print the cost estimate and exit without generating
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Default, Deserialize)]
struct BatchSettings {
    concurrency: Option<usize>,
    continue_on_error: Option<bool>,
}

fn default_animations() -> Vec<AnimationKind> {
    vec![AnimationKind::Idle, AnimationKind::Walk]
}

#[derive(Debug, Deserialize)]
struct CharacterEntry {
    #[serde(default)]
    name: Option<String>,
    prompt: String,
    #[serde(default)]
    style: ArtStyle,
    #[serde(default = "default_animations")]
    animations: Vec<AnimationKind>,
    #[serde(default)]
    skeleton: SkeletonKind,
}

#[derive(Debug, Deserialize)]
struct BatchFile {
    #[serde(default)]
    batch: BatchSettings,
    #[serde(default)]
    characters: Vec<CharacterEntry>,
}

fn load_specs(path: &Path, output_root: &Path) -> Result<(BatchSettings, Vec<GenerationSpec>)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file {}", path.display()))?;
    let file: BatchFile = toml::from_str(&content)
        .with_context(|| format!("Invalid batch file {}", path.display()))?;

    let specs = file
        .characters
        .into_iter()
        .map(|entry| {
            let mut spec = GenerationSpec::new(&entry.prompt, output_root);
            spec.name = entry.name;
            spec.style = entry.style;
            spec.animations = entry.animations;
            spec.skeleton = entry.skeleton;
            spec.output_dir = output_root.join(spec.resolved_name());
            spec
        })
        .collect();

    Ok((file.batch, specs))
}

pub fn run(args: BatchArgs) -> Result<()> {
    exists_or_bail(&args.file, "Batch file")?;

    let (settings, specs) = load_specs(&args.file, &args.output)?;
    if specs.is_empty() {
        anyhow::bail!("Batch file {} has no [[characters]]", args.file.display());
    }
    for spec in &specs {
        spec.validate()?;
    }

    let forge = load_config()?;
    let mut pipeline_config = PipelineConfig::from_forge(&forge);
    if let Some(p) = &args.providers.sprite_provider {
        pipeline_config.sprite_provider = p.clone();
    }
    if let Some(p) = &args.providers.animation_provider {
        pipeline_config.animation_provider = p.clone();
    }
    if let Some(p) = &args.providers.model_provider {
        pipeline_config.model_provider = p.clone();
    }

    let plans: Vec<RunPlan> = specs
        .iter()
        .map(|spec| {
            RunPlan::from_spec(
                spec,
                &pipeline_config.sprite_provider,
                &pipeline_config.animation_provider,
                &pipeline_config.model_provider,
                pipeline_config.video_duration_secs,
            )
        })
        .collect();
    let estimate = estimate_batch(&plans, &PricingTable::builtin());

    println!("Batch of {} characters into {}", specs.len(), args.output.display());
    estimate.print_summary();

    if args.dry_run {
        return Ok(());
    }

    let concurrency = args
        .concurrency
        .or(settings.concurrency)
        .unwrap_or(BatchConfig::default().concurrency);
    let continue_on_error = if args.fail_fast {
        false
    } else {
        settings.continue_on_error.unwrap_or(true)
    };
    let batch_config = BatchConfig::new(concurrency, continue_on_error)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let limiter = Arc::new(RateLimiter::with_defaults(clock.clone()));
    let pipeline = Pipeline::new(pipeline_config, forge, limiter, clock.clone());

    let report_path = args.output.join(spriteforge_pipeline::batch::REPORT_FILE);
    let report = run_batch(&specs, &batch_config, &report_path, clock, |spec| {
        pipeline.run(spec)
    })?;

    println!(
        "Batch done: {}/{} succeeded, {} failed, {:.1}s",
        report.successful, report.total, report.failed, report.duration_secs
    );
    println!("Report: {}", report_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("spriteforge_cli_batch_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_specs_from_toml() {
        let dir = temp_dir();
        let path = dir.join("batch.toml");
        std::fs::write(
            &path,
            r#"
[batch]
concurrency = 3
continue_on_error = false

[[characters]]
name = "knight"
prompt = "a brave knight"
style = "pixel"
animations = ["idle", "walk", "attack"]

[[characters]]
prompt = "a sly goblin archer"
skeleton = "none"
"#,
        )
        .unwrap();

        let (settings, specs) = load_specs(&path, Path::new("out")).unwrap();
        assert_eq!(settings.concurrency, Some(3));
        assert_eq!(settings.continue_on_error, Some(false));
        assert_eq!(specs.len(), 2);

        assert_eq!(specs[0].resolved_name(), "knight");
        assert_eq!(specs[0].animations.len(), 3);
        assert_eq!(specs[0].output_dir, Path::new("out").join("knight"));

        // Second entry: derived name, default animations.
        assert!(specs[1].name.is_none());
        assert_eq!(specs[1].skeleton, SkeletonKind::None);
        assert_eq!(specs[1].animations, default_animations());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_specs_rejects_bad_toml() {
        let dir = temp_dir();
        let path = dir.join("batch.toml");
        std::fs::write(&path, "characters = 12").unwrap();

        assert!(load_specs(&path, Path::new("out")).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
