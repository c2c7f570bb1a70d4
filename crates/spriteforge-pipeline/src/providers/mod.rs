//! Provider registry
//!
//! Maps provider names to concrete implementations, one lookup per stage.

pub mod kling;
pub mod meshy;
pub mod mock;
pub mod openai;
pub mod stability;

mod http;

use spriteforge_core::{ForgeError, Result};
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::ForgeConfig;
use crate::provider::{AnimationProvider, ModelProvider, SpriteProvider};

/// Remote providers with configurable credentials.
pub const REMOTE_PROVIDERS: &[&str] = &["openai", "stability", "kling", "meshy"];

/// Create a sprite (image) provider by name
pub fn create_sprite_provider(
    name: &str,
    config: &ForgeConfig,
) -> Result<Box<dyn SpriteProvider>> {
    match name {
        "mock" => Ok(Box::new(mock::MockProvider::new())),
        "openai" => Ok(Box::new(openai::OpenAiProvider::from_config(config)?)),
        "stability" => Ok(Box::new(stability::StabilityProvider::from_config(config)?)),
        _ => Err(ForgeError::Validation(format!(
            "Unknown sprite provider '{}'. Available: mock, openai, stability",
            name
        ))),
    }
}

/// Create an animation (video) provider by name
pub fn create_animation_provider(
    name: &str,
    config: &ForgeConfig,
) -> Result<Box<dyn AnimationProvider>> {
    match name {
        "mock" => Ok(Box::new(mock::MockProvider::new())),
        "kling" => Ok(Box::new(kling::KlingProvider::from_config(config)?)),
        _ => Err(ForgeError::Validation(format!(
            "Unknown animation provider '{}'. Available: mock, kling",
            name
        ))),
    }
}

/// Create a model (mesh+rig) provider by name
pub fn create_model_provider(
    name: &str,
    config: &ForgeConfig,
    clock: Arc<dyn Clock>,
) -> Result<Box<dyn ModelProvider>> {
    match name {
        "mock" => Ok(Box::new(mock::MockProvider::new())),
        "meshy" => Ok(Box::new(meshy::MeshyProvider::from_config(config, clock)?)),
        _ => Err(ForgeError::Validation(format!(
            "Unknown model provider '{}'. Available: mock, meshy",
            name
        ))),
    }
}

pub fn available_sprite_providers() -> Vec<&'static str> {
    vec!["mock", "openai", "stability"]
}

pub fn available_animation_providers() -> Vec<&'static str> {
    vec!["mock", "kling"]
}

pub fn available_model_providers() -> Vec<&'static str> {
    vec!["mock", "meshy"]
}
