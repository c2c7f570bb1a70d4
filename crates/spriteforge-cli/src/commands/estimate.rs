//! `spriteforge estimate` - price a run or batch without spending credits

use anyhow::Result;
use spriteforge_pipeline::cost::{estimate_run, PricingTable, RunPlan};
use spriteforge_pipeline::{AnimationKind, ArtStyle, GenerationSpec, SkeletonKind};
use std::path::PathBuf;

use super::ProviderArgs;

#[derive(Debug, clap::Args)]
pub struct EstimateArgs {
    /// Character description
    pub prompt: String,

    /// Art style: pixel, cartoon, realistic, lowpoly
    #[arg(long, default_value = "pixel")]
    pub style: ArtStyle,

    /// Comma-separated animation kinds
    #[arg(long, default_value = "idle,walk", value_parser = super::parse_animations)]
    pub animations: std::vec::Vec<AnimationKind>,

    /// Rig skeleton: humanoid, quadruped, none
    #[arg(long, default_value = "humanoid")]
    pub skeleton: SkeletonKind,

    /// Length of each animation clip in seconds
    #[arg(long, default_value = "5")]
    pub duration: u32,

    #[command(flatten)]
    pub providers: ProviderArgs,
}

pub fn run(args: EstimateArgs) -> Result<()> {
    let mut spec = GenerationSpec::new(&args.prompt, PathBuf::from("out"));
    spec.style = args.style;
    spec.animations = args.animations.clone();
    spec.skeleton = args.skeleton;
    spec.validate()?;

    let sprite = args.providers.sprite_provider.as_deref().unwrap_or("openai");
    let animation = args.providers.animation_provider.as_deref().unwrap_or("kling");
    let model = args.providers.model_provider.as_deref().unwrap_or("meshy");

    let plan = RunPlan::from_spec(&spec, sprite, animation, model, args.duration);
    let estimate = estimate_run(&plan, &PricingTable::builtin());

    println!(
        "Estimate for 1 sprite, {} animation clip(s){}:",
        plan.animation_count,
        if plan.include_rigging { ", rigged model" } else { "" }
    );
    estimate.print_summary();
    Ok(())
}
