//! Spriteforge Pipeline - multi-stage AI character asset generation
//!
//! Orchestrates prompt -> 2D sprite -> animated video loops -> rigged 3D
//! model -> web-ready bundle. Each stage delegates to a remote generative
//! provider behind a per-stage capability trait; this crate owns the
//! sequencing, retry/backoff, rate limiting, cost estimation, batch
//! concurrency, and run/batch metadata persistence around those calls.

pub mod batch;
pub mod character;
pub mod clock;
pub mod config;
pub mod cost;
pub mod export;
pub mod pipeline;
pub mod provider;
pub mod providers;
pub mod ratelimit;
pub mod retry;
pub mod run;

pub use batch::{run_batch, BatchConfig, BatchReport};
pub use character::{AnimationKind, ArtStyle, GenerationSpec, SkeletonKind};
pub use clock::{Clock, SystemClock};
pub use config::ForgeConfig;
pub use cost::{CostEstimate, PricingTable, RunPlan};
pub use pipeline::{Pipeline, PipelineConfig};
pub use provider::{
    AnimationProvider, AnimationRequest, ModelProvider, ModelRequest, ProviderStatus,
    SpriteProvider, SpriteRequest, Stage, StageResult,
};
pub use ratelimit::{RateLimit, RateLimiter, RateStatus};
pub use retry::{FailurePolicy, RetryPolicy};
pub use run::{PipelineRun, RunState};
