//! `spriteforge providers` - configuration and health overview

use anyhow::Result;
use spriteforge_pipeline::providers::{
    available_animation_providers, available_model_providers, available_sprite_providers,
    create_animation_provider, create_model_provider, create_sprite_provider,
};
use spriteforge_pipeline::{Clock, ForgeConfig, ProviderStatus, RateLimiter, SystemClock};
use std::sync::Arc;

use super::load_config;

pub fn run() -> Result<()> {
    let config = load_config()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let limits = RateLimiter::default_limits();

    println!("Sprite providers:");
    for name in available_sprite_providers() {
        let status = match create_sprite_provider(name, &config) {
            Ok(provider) => provider.health_check()?,
            Err(_) => ProviderStatus::NoApiKey,
        };
        print_line(name, &status, &config, &limits);
    }

    println!("Animation providers:");
    for name in available_animation_providers() {
        let status = match create_animation_provider(name, &config) {
            Ok(provider) => provider.health_check()?,
            Err(_) => ProviderStatus::NoApiKey,
        };
        print_line(name, &status, &config, &limits);
    }

    println!("Model providers:");
    for name in available_model_providers() {
        let status = match create_model_provider(name, &config, clock.clone()) {
            Ok(provider) => provider.health_check()?,
            Err(_) => ProviderStatus::NoApiKey,
        };
        print_line(name, &status, &config, &limits);
    }

    Ok(())
}

fn print_line(
    name: &str,
    status: &ProviderStatus,
    config: &ForgeConfig,
    limits: &std::collections::HashMap<String, spriteforge_pipeline::RateLimit>,
) {
    let state = match status {
        ProviderStatus::Available => "available",
        ProviderStatus::NoApiKey => "no api key",
        ProviderStatus::Unavailable(_) => "unavailable",
    };
    let enabled = if config.is_enabled(name) { "" } else { " (disabled)" };
    let limit = limits
        .get(name)
        .map(|l| format!(", {} calls / {}s", l.max_calls, l.window.as_secs()))
        .unwrap_or_default();

    println!("  {:<10} {}{}{}", name, state, enabled, limit);
    if let ProviderStatus::Unavailable(reason) = status {
        println!("             {}", reason);
    }
}
