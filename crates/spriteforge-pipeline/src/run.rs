//! Per-run metadata persisted next to the artifacts
//!
//! Every run writes a `run.json` into its output directory so results
//! survive the process, failed runs are inspectable, and the export
//! bundle can be rebuilt without regenerating anything.

use serde::{Deserialize, Serialize};
use spriteforge_core::Result;
use std::path::{Path, PathBuf};

use crate::character::GenerationSpec;
use crate::provider::StageResult;

pub const METADATA_FILE: &str = "run.json";

/// Where a run stopped, or where it is headed next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    ImageDone,
    VideoDone,
    /// Video stage completed with some or all clips missing
    VideoSkippedOrFailed,
    RiggingDone,
    RiggingSkipped,
    ExportDone,
    Failed,
}

/// Everything one pipeline run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: String,
    pub spec: GenerationSpec,
    pub state: RunState,
    #[serde(default)]
    pub sprite: Option<StageResult>,
    #[serde(default)]
    pub animations: Vec<StageResult>,
    #[serde(default)]
    pub model: Option<StageResult>,
    #[serde(default)]
    pub export: Option<StageResult>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub duration_secs: f64,
}

impl PipelineRun {
    pub fn new(spec: GenerationSpec) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            spec,
            state: RunState::Pending,
            sprite: None,
            animations: Vec::new(),
            model: None,
            export: None,
            error: None,
            created_at: now_iso8601(),
            duration_secs: 0.0,
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.spec.output_dir.join(METADATA_FILE)
    }

    /// Persist to `run.json` in the run's output directory.
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.spec.output_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(self.metadata_path(), json)?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(dir.join(METADATA_FILE))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// UTC timestamp without an external chrono dependency.
pub(crate) fn now_iso8601() -> String {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = dur.as_secs();
    let days = secs / 86400;
    let time_secs = secs % 86400;
    let hours = time_secs / 3600;
    let mins = (time_secs % 3600) / 60;
    let s = time_secs % 60;

    let mut y = 1970i64;
    let mut remaining_days = days as i64;
    loop {
        let days_in_year = if is_leap(y) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        y += 1;
    }
    let month_days = [
        31,
        if is_leap(y) { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];
    let mut m = 0usize;
    for (i, &md) in month_days.iter().enumerate() {
        if remaining_days < md as i64 {
            m = i;
            break;
        }
        remaining_days -= md as i64;
    }

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        y,
        m + 1,
        remaining_days + 1,
        hours,
        mins,
        s
    )
}

fn is_leap(y: i64) -> bool {
    y % 4 == 0 && (y % 100 != 0 || y % 400 == 0)
}
