//! Stage coordinator
//!
//! Drives one character through sprite -> animations -> rigged model ->
//! bundle, persisting `run.json` after every stage transition. The
//! sprite stage is load-bearing and aborts the run; later stages degrade
//! per their failure policy so one flaky provider never wastes the
//! credits already spent.

use spriteforge_core::{ForgeError, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::character::{AnimationKind, GenerationSpec};
use crate::clock::Clock;
use crate::config::ForgeConfig;
use crate::provider::{
    AnimationProvider, AnimationRequest, ModelProvider, ModelRequest, SpriteProvider,
    SpriteRequest, StageResult,
};
use crate::providers;
use crate::ratelimit::RateLimiter;
use crate::retry::{FailurePolicy, RetryPolicy};
use crate::run::{PipelineRun, RunState};

/// Per-run knobs; provider names default from `ForgeConfig` stage defaults
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sprite_provider: String,
    pub animation_provider: String,
    pub model_provider: String,
    pub retry: RetryPolicy,
    /// What a failed animation clip does to the run
    pub video_failure: FailurePolicy,
    /// What a failed model stage does to the run
    pub model_failure: FailurePolicy,
    pub skip_rigging: bool,
    pub skip_export: bool,
    /// Square sprite resolution in pixels
    pub sprite_size: u32,
    /// Target length of each animation clip in seconds
    pub video_duration_secs: u32,
}

impl PipelineConfig {
    pub fn from_forge(config: &ForgeConfig) -> Self {
        Self {
            sprite_provider: config.defaults.sprite_provider.clone(),
            animation_provider: config.defaults.animation_provider.clone(),
            model_provider: config.defaults.model_provider.clone(),
            retry: RetryPolicy::default(),
            video_failure: FailurePolicy::SoftFail,
            model_failure: FailurePolicy::SoftFail,
            skip_rigging: false,
            skip_export: false,
            sprite_size: 1024,
            video_duration_secs: 5,
        }
    }
}

/// Where stage calls go: named providers created lazily from config, or
/// pre-built instances injected by tests.
enum Clients {
    Named(ForgeConfig),
    Injected {
        sprite: Box<dyn SpriteProvider>,
        animation: Box<dyn AnimationProvider>,
        model: Box<dyn ModelProvider>,
    },
}

pub struct Pipeline {
    config: PipelineConfig,
    clients: Clients,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        forge: ForgeConfig,
        limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            clients: Clients::Named(forge),
            limiter,
            clock,
        }
    }

    /// Build a pipeline around pre-constructed providers, bypassing the
    /// name registry.
    pub fn with_clients(
        config: PipelineConfig,
        sprite: Box<dyn SpriteProvider>,
        animation: Box<dyn AnimationProvider>,
        model: Box<dyn ModelProvider>,
        limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            clients: Clients::Injected {
                sprite,
                animation,
                model,
            },
            limiter,
            clock,
        }
    }

    /// Run the full pipeline for one character spec.
    ///
    /// A sprite failure aborts the run after persisting its metadata.
    /// Animation and model failures degrade per the configured policy,
    /// so the returned run may carry fewer clips than requested or a
    /// placeholder model.
    pub fn run(&self, spec: &GenerationSpec) -> Result<PipelineRun> {
        spec.validate()?;
        std::fs::create_dir_all(&spec.output_dir)?;

        let mut run = PipelineRun::new(spec.clone());
        let name = spec.resolved_name();
        let started = self.clock.now();

        // Stage 1: sprite. Hard failure, nothing downstream works without it.
        match self.sprite_stage(&name, spec) {
            Ok(result) => {
                run.sprite = Some(result);
                run.state = RunState::ImageDone;
                run.save()?;
            }
            Err(e) => {
                run.state = RunState::Failed;
                run.error = Some(e.to_string());
                run.duration_secs = self.elapsed(started);
                run.save()?;
                return Err(e);
            }
        }

        // Stage 2: animations, one clip per distinct kind, in parallel.
        let kinds = spec.distinct_animations();
        let requested = kinds.len();
        let (clips, first_failure) = self.animation_stage(&name, spec, &kinds);
        run.animations = clips;
        if let Some(e) = first_failure {
            if self.config.video_failure == FailurePolicy::HardFail {
                run.state = RunState::Failed;
                run.error = Some(e.to_string());
                run.duration_secs = self.elapsed(started);
                run.save()?;
                return Err(e);
            }
        }
        run.state = if run.animations.len() == requested {
            RunState::VideoDone
        } else {
            RunState::VideoSkippedOrFailed
        };
        run.save()?;

        // Stage 3: rigged model.
        if self.config.skip_rigging {
            run.state = RunState::RiggingSkipped;
        } else {
            match self.model_stage(&name, spec, &run) {
                Ok(result) => {
                    run.model = Some(result);
                    run.state = RunState::RiggingDone;
                }
                Err(e) => match self.config.model_failure {
                    FailurePolicy::SoftFail => {
                        eprintln!("[{}] Model stage failed ({}), writing placeholder", name, e);
                        let path =
                            providers::mock::write_minimal_glb(&spec.output_dir, &format!("{}_rigged", name))?;
                        run.model = Some(StageResult::placeholder(path.to_string_lossy()));
                        run.error = Some(e.to_string());
                        run.state = RunState::RiggingDone;
                    }
                    FailurePolicy::HardFail => {
                        run.state = RunState::Failed;
                        run.error = Some(e.to_string());
                        run.duration_secs = self.elapsed(started);
                        run.save()?;
                        return Err(e);
                    }
                },
            }
        }
        run.save()?;

        // Stage 4: bundle export. Local-only and soft: the artifacts are
        // already on disk even if packaging fails.
        if !self.config.skip_export {
            match crate::export::package_bundle(&run) {
                Ok(result) => {
                    run.export = Some(result);
                    run.state = RunState::ExportDone;
                }
                Err(e) => {
                    eprintln!("[{}] Export failed: {}", name, e);
                    run.error = Some(e.to_string());
                }
            }
        }

        run.duration_secs = self.elapsed(started);
        run.save()?;
        Ok(run)
    }

    fn elapsed(&self, started: std::time::Instant) -> f64 {
        self.clock.now().duration_since(started).as_secs_f64()
    }

    fn sprite_dir(&self, spec: &GenerationSpec) -> PathBuf {
        spec.output_dir.clone()
    }

    fn sprite_stage(&self, name: &str, spec: &GenerationSpec) -> Result<StageResult> {
        let holder;
        let provider: &dyn SpriteProvider = match &self.clients {
            Clients::Named(forge) => {
                holder = providers::create_sprite_provider(&self.config.sprite_provider, forge)?;
                &*holder
            }
            Clients::Injected { sprite, .. } => &**sprite,
        };
        eprintln!("[{}] Generating sprite via {}", name, provider.name());

        let request = SpriteRequest {
            name: name.to_string(),
            prompt: spec.prompt.clone(),
            style: spec.style,
            size: self.config.sprite_size,
        };
        let output_dir = self.sprite_dir(spec);

        self.config.retry.run(&*self.clock, || {
            self.limiter.acquire(provider.name());
            provider.generate(&request, &output_dir)
        })
    }

    /// Generate one clip per kind inside a scoped thread per clip.
    /// Failed clips are logged and omitted from the returned set; the
    /// first failure also comes back so the caller can apply its policy.
    fn animation_stage(
        &self,
        name: &str,
        spec: &GenerationSpec,
        kinds: &[AnimationKind],
    ) -> (Vec<StageResult>, Option<ForgeError>) {
        if kinds.is_empty() {
            return (Vec::new(), None);
        }

        let sprite_path = self.sprite_dir(spec).join(format!("{}.png", name));

        let holder;
        let provider: &dyn AnimationProvider = match &self.clients {
            Clients::Named(forge) => {
                match providers::create_animation_provider(&self.config.animation_provider, forge) {
                    Ok(p) => {
                        holder = p;
                        &*holder
                    }
                    Err(e) => {
                        eprintln!("[{}] Animation provider unavailable: {}", name, e);
                        return (Vec::new(), Some(e));
                    }
                }
            }
            Clients::Injected { animation, .. } => &**animation,
        };

        let output_dir = spec.output_dir.join("animations");
        let mut results = Vec::with_capacity(kinds.len());

        let outcomes: Vec<(AnimationKind, Result<StageResult>)> = std::thread::scope(|scope| {
            let handles: Vec<_> = kinds
                .iter()
                .map(|&kind| {
                    let request = AnimationRequest {
                        name: name.to_string(),
                        sprite_path: sprite_path.clone(),
                        kind,
                        style: spec.style,
                        duration_secs: self.config.video_duration_secs,
                    };
                    let output_dir = output_dir.clone();
                    scope.spawn(move || {
                        let result = self.config.retry.run(&*self.clock, || {
                            self.limiter.acquire(provider.name());
                            provider.animate(&request, &output_dir)
                        });
                        (kind, result)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(outcome) => outcome,
                    Err(_) => unreachable!("animation worker panicked"),
                })
                .collect()
        });

        let mut first_failure = None;
        for (kind, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    eprintln!("[{}] Animation '{}' failed: {}", name, kind, e);
                    if first_failure.is_none() {
                        first_failure = Some(e);
                    }
                }
            }
        }
        (results, first_failure)
    }

    fn model_stage(
        &self,
        name: &str,
        spec: &GenerationSpec,
        run: &PipelineRun,
    ) -> Result<StageResult> {
        let holder;
        let provider: &dyn ModelProvider = match &self.clients {
            Clients::Named(forge) => {
                holder = providers::create_model_provider(
                    &self.config.model_provider,
                    forge,
                    self.clock.clone(),
                )?;
                &*holder
            }
            Clients::Injected { model, .. } => &**model,
        };

        let sprite_path = run
            .sprite
            .as_ref()
            .map(|s| PathBuf::from(&s.artifact))
            .unwrap_or_else(|| self.sprite_dir(spec).join(format!("{}.png", name)));

        let request = ModelRequest {
            name: name.to_string(),
            sprite_path,
            prompt: spec.prompt.clone(),
            style: spec.style,
            skeleton: spec.skeleton,
        };

        self.config.retry.run(&*self.clock, || {
            self.limiter.acquire(provider.name());
            provider.generate_rigged(&request, &spec.output_dir)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::ArtStyle;
    use crate::providers::mock::MockProvider;
    use crate::run::RunState;

    fn temp_dir() -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("spriteforge_pipeline_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn test_config() -> PipelineConfig {
        let mut config = PipelineConfig::from_forge(&ForgeConfig::default());
        config.sprite_provider = "mock".to_string();
        config.animation_provider = "mock".to_string();
        config.model_provider = "mock".to_string();
        config.retry = RetryPolicy::new(1, std::time::Duration::from_millis(1)).unwrap();
        config
    }

    fn pipeline_with(
        config: PipelineConfig,
        sprite: MockProvider,
        animation: MockProvider,
        model: MockProvider,
    ) -> Pipeline {
        let clock: Arc<dyn Clock> = Arc::new(crate::clock::SystemClock);
        let limiter = Arc::new(RateLimiter::with_defaults(clock.clone()));
        Pipeline::with_clients(
            config,
            Box::new(sprite),
            Box::new(animation),
            Box::new(model),
            limiter,
            clock,
        )
    }

    fn spec_in(dir: &PathBuf) -> GenerationSpec {
        let mut spec = GenerationSpec::new("a brave knight with a shield", dir);
        spec.name = Some("knight".to_string());
        spec.style = ArtStyle::Pixel;
        spec
    }

    #[test]
    fn test_full_run_reaches_export_done() {
        let dir = temp_dir();
        let pipeline = pipeline_with(
            test_config(),
            MockProvider::new(),
            MockProvider::new(),
            MockProvider::new(),
        );

        let run = pipeline.run(&spec_in(&dir)).unwrap();
        assert_eq!(run.state, RunState::ExportDone);
        assert!(run.sprite.is_some());
        assert_eq!(run.animations.len(), 2);
        assert!(run.model.is_some());
        assert!(!run.model.as_ref().unwrap().is_placeholder());
        assert!(run.export.is_some());

        // Metadata persisted and reloadable
        let loaded = PipelineRun::load(&dir).unwrap();
        assert_eq!(loaded.state, RunState::ExportDone);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_sprite_failure_aborts_and_persists() {
        let dir = temp_dir();
        let pipeline = pipeline_with(
            test_config(),
            MockProvider::failing_sprite(),
            MockProvider::new(),
            MockProvider::new(),
        );

        assert!(pipeline.run(&spec_in(&dir)).is_err());

        let loaded = PipelineRun::load(&dir).unwrap();
        assert_eq!(loaded.state, RunState::Failed);
        assert!(loaded.error.is_some());
        assert!(loaded.sprite.is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_animation_failure_degrades_not_aborts() {
        let dir = temp_dir();
        let pipeline = pipeline_with(
            test_config(),
            MockProvider::new(),
            MockProvider::failing_animation(),
            MockProvider::new(),
        );

        let run = pipeline.run(&spec_in(&dir)).unwrap();
        assert!(run.animations.is_empty());
        assert!(run.sprite.is_some());
        assert!(run.model.is_some());
        // Clips missing but the run still completed through export.
        assert_eq!(run.state, RunState::ExportDone);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_animation_hard_fail_aborts() {
        let dir = temp_dir();
        let mut config = test_config();
        config.video_failure = FailurePolicy::HardFail;
        let pipeline = pipeline_with(
            config,
            MockProvider::new(),
            MockProvider::failing_animation(),
            MockProvider::new(),
        );

        assert!(pipeline.run(&spec_in(&dir)).is_err());
        let loaded = PipelineRun::load(&dir).unwrap();
        assert_eq!(loaded.state, RunState::Failed);
        assert!(loaded.error.is_some());
        // The sprite stage had already succeeded and stays recorded.
        assert!(loaded.sprite.is_some());
        assert!(loaded.model.is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_injected_providers_win_over_configured_names() {
        let dir = temp_dir();
        let mut config = test_config();
        config.sprite_provider = "openai".to_string();
        let pipeline = pipeline_with(
            config,
            MockProvider::new(),
            MockProvider::new(),
            MockProvider::new(),
        );

        let run = pipeline.run(&spec_in(&dir)).unwrap();
        // Stage results carry the provider that actually ran, not the
        // configured name.
        assert_eq!(run.sprite.unwrap().provider, "mock");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_model_failure_writes_placeholder() {
        let dir = temp_dir();
        let pipeline = pipeline_with(
            test_config(),
            MockProvider::new(),
            MockProvider::new(),
            MockProvider::failing_model(),
        );

        let run = pipeline.run(&spec_in(&dir)).unwrap();
        let model = run.model.unwrap();
        assert!(model.is_placeholder());

        let bytes = std::fs::read(&model.artifact).unwrap();
        assert_eq!(&bytes[..4], b"glTF");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_model_hard_fail_aborts() {
        let dir = temp_dir();
        let mut config = test_config();
        config.model_failure = FailurePolicy::HardFail;
        let pipeline = pipeline_with(
            config,
            MockProvider::new(),
            MockProvider::new(),
            MockProvider::failing_model(),
        );

        assert!(pipeline.run(&spec_in(&dir)).is_err());
        let loaded = PipelineRun::load(&dir).unwrap();
        assert_eq!(loaded.state, RunState::Failed);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_skip_rigging_and_export() {
        let dir = temp_dir();
        let mut config = test_config();
        config.skip_rigging = true;
        config.skip_export = true;
        let pipeline = pipeline_with(
            config,
            MockProvider::new(),
            MockProvider::new(),
            MockProvider::new(),
        );

        let run = pipeline.run(&spec_in(&dir)).unwrap();
        assert_eq!(run.state, RunState::RiggingSkipped);
        assert!(run.model.is_none());
        assert!(run.export.is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_spec_rejected_before_any_stage() {
        let dir = temp_dir();
        let pipeline = pipeline_with(
            test_config(),
            MockProvider::new(),
            MockProvider::new(),
            MockProvider::new(),
        );

        let spec = GenerationSpec::new("   ", &dir);
        assert!(pipeline.run(&spec).is_err());
        // Nothing persisted for a spec that never started.
        assert!(PipelineRun::load(&dir).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_named_mock_providers_via_registry() {
        let dir = temp_dir();
        let clock: Arc<dyn Clock> = Arc::new(crate::clock::SystemClock);
        let limiter = Arc::new(RateLimiter::with_defaults(clock.clone()));
        let pipeline = Pipeline::new(test_config(), ForgeConfig::default(), limiter, clock);

        let run = pipeline.run(&spec_in(&dir)).unwrap();
        assert_eq!(run.state, RunState::ExportDone);

        std::fs::remove_dir_all(&dir).ok();
    }
}
