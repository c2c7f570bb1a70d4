//! Cost estimation
//!
//! Predicts provider spend for a run or batch before any credits burn.
//! Prices are point-in-time list prices; estimates assume every stage
//! runs once with no retries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::character::{GenerationSpec, SkeletonKind};
use crate::provider::Stage;

/// Per-call pricing for one provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Price {
    /// Price per billing unit, in USD
    pub unit_price: f64,
    /// What one unit is ("image", "second", "rig")
    pub unit: &'static str,
}

/// Known provider prices
#[derive(Debug, Clone)]
pub struct PricingTable {
    prices: HashMap<&'static str, Price>,
}

impl PricingTable {
    /// List prices as of mid-2025.
    pub fn builtin() -> Self {
        let mut prices = HashMap::new();
        prices.insert(
            "openai",
            Price {
                unit_price: 0.04,
                unit: "image",
            },
        );
        prices.insert(
            "stability",
            Price {
                unit_price: 0.03,
                unit: "image",
            },
        );
        prices.insert(
            "kling",
            Price {
                unit_price: 0.05,
                unit: "second",
            },
        );
        prices.insert(
            "meshy",
            Price {
                unit_price: 0.25,
                unit: "rig",
            },
        );
        prices.insert(
            "mock",
            Price {
                unit_price: 0.0,
                unit: "call",
            },
        );
        Self { prices }
    }

    pub fn price(&self, provider: &str) -> Option<Price> {
        self.prices.get(provider).copied()
    }
}

/// What a run will ask each provider to do
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub sprite_provider: String,
    pub animation_provider: String,
    pub model_provider: String,
    pub animation_count: u32,
    pub seconds_per_animation: u32,
    pub include_rigging: bool,
}

impl RunPlan {
    pub fn from_spec(
        spec: &GenerationSpec,
        sprite_provider: &str,
        animation_provider: &str,
        model_provider: &str,
        seconds_per_animation: u32,
    ) -> Self {
        Self {
            sprite_provider: sprite_provider.to_string(),
            animation_provider: animation_provider.to_string(),
            model_provider: model_provider.to_string(),
            animation_count: spec.distinct_animations().len() as u32,
            seconds_per_animation,
            include_rigging: spec.skeleton != SkeletonKind::None,
        }
    }
}

/// One priced stage of an estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostLine {
    pub stage: Stage,
    pub provider: String,
    pub units: f64,
    pub unit_price: f64,
    pub subtotal: f64,
}

/// Priced breakdown for a run or batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostEstimate {
    pub lines: Vec<CostLine>,
    pub total: f64,
}

impl CostEstimate {
    fn push(&mut self, stage: Stage, provider: &str, units: f64, price: Option<Price>) {
        let unit_price = price.map(|p| p.unit_price).unwrap_or(0.0);
        let subtotal = units * unit_price;
        self.lines.push(CostLine {
            stage,
            provider: provider.to_string(),
            units,
            unit_price,
            subtotal,
        });
        self.total += subtotal;
    }

    /// Merge another estimate's lines into this one.
    pub fn absorb(&mut self, other: CostEstimate) {
        self.total += other.total;
        self.lines.extend(other.lines);
    }

    pub fn print_summary(&self) {
        for line in &self.lines {
            println!(
                "  {:<10} {:<12} {:>6.1} x ${:<6.3} = ${:.2}",
                line.stage.to_string(),
                line.provider,
                line.units,
                line.unit_price,
                line.subtotal
            );
        }
        println!("  Estimated total: ${:.2}", self.total);
    }
}

/// Estimate spend for one run.
pub fn estimate_run(plan: &RunPlan, pricing: &PricingTable) -> CostEstimate {
    let mut estimate = CostEstimate::default();

    estimate.push(
        Stage::Sprite,
        &plan.sprite_provider,
        1.0,
        pricing.price(&plan.sprite_provider),
    );

    if plan.animation_count > 0 {
        let seconds = (plan.animation_count * plan.seconds_per_animation) as f64;
        estimate.push(
            Stage::Animation,
            &plan.animation_provider,
            seconds,
            pricing.price(&plan.animation_provider),
        );
    }

    if plan.include_rigging {
        estimate.push(
            Stage::Model,
            &plan.model_provider,
            1.0,
            pricing.price(&plan.model_provider),
        );
    }

    estimate
}

/// Estimate spend for a batch of runs.
pub fn estimate_batch(plans: &[RunPlan], pricing: &PricingTable) -> CostEstimate {
    let mut total = CostEstimate::default();
    for plan in plans {
        total.absorb(estimate_run(plan, pricing));
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::AnimationKind;

    fn plan(animation_count: u32, seconds: u32, rigging: bool) -> RunPlan {
        RunPlan {
            sprite_provider: "openai".to_string(),
            animation_provider: "kling".to_string(),
            model_provider: "meshy".to_string(),
            animation_count,
            seconds_per_animation: seconds,
            include_rigging: rigging,
        }
    }

    #[test]
    fn test_full_run_estimate() {
        // 1 image + 2 clips x 4s of video + 1 rig
        let estimate = estimate_run(&plan(2, 4, true), &PricingTable::builtin());
        assert_eq!(estimate.lines.len(), 3);
        assert!((estimate.total - 0.69).abs() < 1e-9);
    }

    #[test]
    fn test_no_rigging_drops_model_line() {
        let estimate = estimate_run(&plan(2, 4, false), &PricingTable::builtin());
        assert_eq!(estimate.lines.len(), 2);
        assert!((estimate.total - 0.44).abs() < 1e-9);
    }

    #[test]
    fn test_no_animations_drops_video_line() {
        let estimate = estimate_run(&plan(0, 4, true), &PricingTable::builtin());
        assert_eq!(estimate.lines.len(), 2);
        assert!((estimate.total - 0.29).abs() < 1e-9);
    }

    #[test]
    fn test_mock_run_is_free() {
        let plan = RunPlan {
            sprite_provider: "mock".to_string(),
            animation_provider: "mock".to_string(),
            model_provider: "mock".to_string(),
            animation_count: 5,
            seconds_per_animation: 5,
            include_rigging: true,
        };
        let estimate = estimate_run(&plan, &PricingTable::builtin());
        assert_eq!(estimate.total, 0.0);
    }

    #[test]
    fn test_batch_estimate_sums_runs() {
        let plans = vec![plan(2, 4, true), plan(2, 4, true), plan(0, 4, false)];
        let estimate = estimate_batch(&plans, &PricingTable::builtin());
        assert!((estimate.total - (0.69 * 2.0 + 0.04)).abs() < 1e-9);
    }

    #[test]
    fn test_plan_from_spec_counts_distinct_animations() {
        let mut spec = GenerationSpec::new("a slime", "/tmp/out");
        spec.animations = vec![
            AnimationKind::Idle,
            AnimationKind::Walk,
            AnimationKind::Idle,
        ];
        let plan = RunPlan::from_spec(&spec, "openai", "kling", "meshy", 5);
        assert_eq!(plan.animation_count, 2);
        assert!(plan.include_rigging);

        spec.skeleton = SkeletonKind::None;
        let plan = RunPlan::from_spec(&spec, "openai", "kling", "meshy", 5);
        assert!(!plan.include_rigging);
    }
}
