//! `spriteforge generate` - one character, end to end

use anyhow::Result;
use spriteforge_pipeline::cost::{estimate_run, PricingTable, RunPlan};
use spriteforge_pipeline::{Clock, Pipeline, PipelineConfig, RateLimiter, SystemClock};
use std::sync::Arc;

use super::{load_config, print_run_summary, CharacterArgs, ProviderArgs};

#[derive(Debug, clap::Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub character: CharacterArgs,

    #[command(flatten)]
    pub providers: ProviderArgs,

    /// Length of each animation clip in seconds
    #[arg(long, default_value = "5")]
    pub duration: u32,

    /// Square sprite resolution in pixels
    #[arg(long, default_value = "1024")]
    pub size: u32,

    /// Skip the rigged 3D model stage
    #[arg(long)]
    pub skip_rigging: bool,

    /// Skip the bundle export stage
    #[arg(long)]
    pub skip_export: bool,

    /// Print the cost estimate and exit without generating
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: GenerateArgs) -> Result<()> {
    let forge = load_config()?;
    let spec = args.character.to_spec();
    spec.validate()?;

    let mut config = PipelineConfig::from_forge(&forge);
    if let Some(p) = &args.providers.sprite_provider {
        config.sprite_provider = p.clone();
    }
    if let Some(p) = &args.providers.animation_provider {
        config.animation_provider = p.clone();
    }
    if let Some(p) = &args.providers.model_provider {
        config.model_provider = p.clone();
    }
    config.skip_rigging = args.skip_rigging;
    config.skip_export = args.skip_export;
    config.video_duration_secs = args.duration;
    config.sprite_size = args.size;

    let plan = RunPlan::from_spec(
        &spec,
        &config.sprite_provider,
        &config.animation_provider,
        &config.model_provider,
        config.video_duration_secs,
    );
    let estimate = estimate_run(
        &if args.skip_rigging {
            RunPlan {
                include_rigging: false,
                ..plan
            }
        } else {
            plan
        },
        &PricingTable::builtin(),
    );

    println!("Generating '{}' into {}", spec.resolved_name(), spec.output_dir.display());
    estimate.print_summary();

    if args.dry_run {
        return Ok(());
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let limiter = Arc::new(RateLimiter::with_defaults(clock.clone()));
    let pipeline = Pipeline::new(config, forge, limiter, clock);

    let run = pipeline.run(&spec)?;
    print_run_summary(&run);
    Ok(())
}
