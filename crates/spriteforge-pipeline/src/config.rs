//! Layered configuration system
//!
//! Config is loaded with three layers of precedence (highest wins):
//! 1. Environment variables: `SPRITEFORGE_{PROVIDER}_API_KEY`
//! 2. Project-local: `.spriteforge/config.toml`
//! 3. Global: `~/.spriteforge/config.toml`

use serde::{Deserialize, Serialize};
use spriteforge_core::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::provider::Stage;

/// Provider-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Default provider per stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDefaults {
    #[serde(default = "default_sprite_provider")]
    pub sprite_provider: String,
    #[serde(default = "default_animation_provider")]
    pub animation_provider: String,
    #[serde(default = "default_model_provider")]
    pub model_provider: String,
}

impl Default for StageDefaults {
    fn default() -> Self {
        Self {
            sprite_provider: default_sprite_provider(),
            animation_provider: default_animation_provider(),
            model_provider: default_model_provider(),
        }
    }
}

fn default_sprite_provider() -> String {
    "openai".to_string()
}
fn default_animation_provider() -> String {
    "kling".to_string()
}
fn default_model_provider() -> String {
    "meshy".to_string()
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgeConfigFile {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub defaults: StageDefaults,
}

/// Resolved configuration with environment variable overrides applied
#[derive(Debug, Clone, Default)]
pub struct ForgeConfig {
    pub providers: HashMap<String, ProviderConfig>,
    pub defaults: StageDefaults,
}

impl ForgeConfig {
    /// Load config with layered precedence: global < project < env vars
    pub fn load() -> Result<Self> {
        let mut config = ForgeConfigFile::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                Self::merge_into(&mut config, global);
            }
        }

        let local_path = PathBuf::from(".spriteforge/config.toml");
        if local_path.exists() {
            let local = Self::load_file(&local_path)?;
            Self::merge_into(&mut config, local);
        }

        Self::apply_env_overrides(&mut config);

        Ok(ForgeConfig {
            providers: config.providers,
            defaults: config.defaults,
        })
    }

    /// Load config from a specific file path only (for testing)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        Self::apply_env_overrides(&mut config);
        Ok(ForgeConfig {
            providers: config.providers,
            defaults: config.defaults,
        })
    }

    pub fn api_key(&self, provider_name: &str) -> Option<&str> {
        self.providers
            .get(provider_name)
            .and_then(|p| p.api_key.as_deref())
    }

    /// API URL override for a provider, if configured
    pub fn api_url(&self, provider_name: &str) -> Option<&str> {
        self.providers
            .get(provider_name)
            .and_then(|p| p.api_url.as_deref())
    }

    pub fn is_enabled(&self, provider_name: &str) -> bool {
        self.providers
            .get(provider_name)
            .map(|p| p.enabled)
            .unwrap_or(true)
    }

    /// Default provider name for a generation stage. Export is local-only
    /// and has no provider.
    pub fn default_provider(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Sprite => Some(&self.defaults.sprite_provider),
            Stage::Animation => Some(&self.defaults.animation_provider),
            Stage::Model => Some(&self.defaults.model_provider),
            Stage::Export => None,
        }
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".spriteforge").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<ForgeConfigFile> {
        let content = std::fs::read_to_string(path)?;
        let config: ForgeConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    fn merge_into(base: &mut ForgeConfigFile, overlay: ForgeConfigFile) {
        for (name, provider) in overlay.providers {
            let entry = base.providers.entry(name).or_default();
            if provider.api_key.is_some() {
                entry.api_key = provider.api_key;
            }
            if provider.api_url.is_some() {
                entry.api_url = provider.api_url;
            }
            entry.enabled = provider.enabled;
        }

        if overlay.defaults.sprite_provider != default_sprite_provider() {
            base.defaults.sprite_provider = overlay.defaults.sprite_provider;
        }
        if overlay.defaults.animation_provider != default_animation_provider() {
            base.defaults.animation_provider = overlay.defaults.animation_provider;
        }
        if overlay.defaults.model_provider != default_model_provider() {
            base.defaults.model_provider = overlay.defaults.model_provider;
        }
    }

    fn apply_env_overrides(config: &mut ForgeConfigFile) {
        for name in crate::providers::REMOTE_PROVIDERS {
            let env_key = format!("SPRITEFORGE_{}_API_KEY", name.to_uppercase());
            if let Ok(key) = std::env::var(&env_key) {
                let entry = config.providers.entry(name.to_string()).or_default();
                entry.api_key = Some(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_config(content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("forge_config_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_config_from_file() {
        std::env::remove_var("SPRITEFORGE_OPENAI_API_KEY");

        let config_str = r#"
[providers.openai]
api_key = "sk-test-123"
api_url = "https://api.example.com/images"
enabled = true

[providers.kling]
api_key = "fal-test"
enabled = false

[defaults]
sprite_provider = "stability"
"#;
        let path = temp_config(config_str);
        let config = ForgeConfig::load_from_file(&path).unwrap();

        assert!(config.is_enabled("openai"));
        assert!(!config.is_enabled("kling"));
        assert_eq!(config.api_key("openai"), Some("sk-test-123"));
        assert_eq!(
            config.api_url("openai"),
            Some("https://api.example.com/images")
        );
        assert_eq!(config.default_provider(Stage::Sprite), Some("stability"));

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_env_var_override() {
        let config_str = r#"
[providers.meshy]
api_key = "file-key"
"#;
        let path = temp_config(config_str);

        std::env::set_var("SPRITEFORGE_MESHY_API_KEY", "env-key-override");
        let config = ForgeConfig::load_from_file(&path).unwrap();
        assert_eq!(config.api_key("meshy"), Some("env-key-override"));

        std::env::remove_var("SPRITEFORGE_MESHY_API_KEY");
        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_default_providers_per_stage() {
        let config = ForgeConfig::default();
        assert_eq!(config.default_provider(Stage::Sprite), Some("openai"));
        assert_eq!(config.default_provider(Stage::Animation), Some("kling"));
        assert_eq!(config.default_provider(Stage::Model), Some("meshy"));
        assert_eq!(config.default_provider(Stage::Export), None);
    }

    #[test]
    fn test_missing_provider_returns_none() {
        let config = ForgeConfig::default();
        assert_eq!(config.api_key("nonexistent"), None);
        assert!(config.is_enabled("nonexistent"));
    }
}
