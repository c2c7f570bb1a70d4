//! Batch generation
//!
//! Runs many character specs with bounded concurrency: specs are
//! processed in chunks of `concurrency`, one scoped thread per spec
//! inside a chunk. Failures are recorded per entry; by default the batch
//! keeps going, or it stops at the end of the failing chunk when
//! `continue_on_error` is off. A `batch_report.json` is always written.

use spriteforge_core::{ForgeError, Result};
use std::path::Path;
use std::sync::Arc;

use crate::character::GenerationSpec;
use crate::clock::Clock;
use crate::run::{now_iso8601, PipelineRun};

pub const REPORT_FILE: &str = "batch_report.json";

#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    /// Specs processed simultaneously
    pub concurrency: usize,
    /// Keep running remaining chunks after a failed spec
    pub continue_on_error: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            continue_on_error: true,
        }
    }
}

impl BatchConfig {
    pub fn new(concurrency: usize, continue_on_error: bool) -> Result<Self> {
        if concurrency == 0 {
            return Err(ForgeError::Validation(
                "Batch concurrency must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            concurrency,
            continue_on_error,
        })
    }
}

/// Outcome of one spec in the batch
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BatchEntry {
    pub name: String,
    pub duration_secs: f64,
    #[serde(default)]
    pub run: Option<PipelineRun>,
    #[serde(default)]
    pub error: Option<String>,
}

impl BatchEntry {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary persisted after every batch, even aborted ones
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub duration_secs: f64,
    pub generated_at: String,
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Run every spec through `run_item`, `config.concurrency` at a time.
///
/// The report lands at `report_path` before this returns, including when
/// the batch aborts early; in that case the first failure is returned
/// after the in-flight chunk drains.
pub fn run_batch<F>(
    specs: &[GenerationSpec],
    config: &BatchConfig,
    report_path: &Path,
    clock: Arc<dyn Clock>,
    run_item: F,
) -> Result<BatchReport>
where
    F: Fn(&GenerationSpec) -> Result<PipelineRun> + Sync,
{
    let started = clock.now();
    let mut entries: Vec<BatchEntry> = Vec::with_capacity(specs.len());
    let mut first_error: Option<ForgeError> = None;

    for chunk in specs.chunks(config.concurrency.max(1)) {
        let outcomes: Vec<(String, f64, Result<PipelineRun>)> = std::thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|spec| {
                    let clock = clock.clone();
                    let run_item = &run_item;
                    scope.spawn(move || {
                        let name = spec.resolved_name();
                        let item_start = clock.now();
                        let outcome = run_item(spec);
                        let duration = clock.now().duration_since(item_start).as_secs_f64();
                        (name, duration, outcome)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(outcome) => outcome,
                    Err(_) => unreachable!("batch worker panicked"),
                })
                .collect()
        });

        let mut chunk_failed = false;
        for (name, duration_secs, outcome) in outcomes {
            match outcome {
                Ok(run) => {
                    eprintln!("[batch] {} done in {:.1}s", name, duration_secs);
                    entries.push(BatchEntry {
                        name,
                        duration_secs,
                        run: Some(run),
                        error: None,
                    });
                }
                Err(e) => {
                    eprintln!("[batch] {} failed: {}", name, e);
                    chunk_failed = true;
                    entries.push(BatchEntry {
                        name,
                        duration_secs,
                        run: None,
                        error: Some(e.to_string()),
                    });
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if chunk_failed && !config.continue_on_error {
            break;
        }
    }

    let successful = entries.iter().filter(|e| e.succeeded()).count();
    let report = BatchReport {
        total: specs.len(),
        successful,
        failed: entries.len() - successful,
        duration_secs: clock.now().duration_since(started).as_secs_f64(),
        generated_at: now_iso8601(),
        entries,
    };
    report.save(report_path)?;

    match first_error {
        Some(e) if !config.continue_on_error => Err(e),
        _ => Ok(report),
    }
}
