//! Spriteforge CLI - prompt to web-ready character assets

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{batch, estimate, generate, providers};

#[derive(Parser)]
#[command(name = "spriteforge")]
#[command(about = "Generate animated, rigged game characters from a text prompt", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one character: sprite, animation clips, rigged model, bundle
    Generate(generate::GenerateArgs),

    /// Generate a batch of characters from a TOML file
    Batch(batch::BatchArgs),

    /// Estimate provider spend without calling anything
    Estimate(estimate::EstimateArgs),

    /// List providers, their configuration status, and rate limits
    Providers,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => generate::run(args),
        Commands::Batch(args) => batch::run(args),
        Commands::Estimate(args) => estimate::run(args),
        Commands::Providers => providers::run(),
    }
}
