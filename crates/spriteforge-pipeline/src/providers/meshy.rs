//! Meshy image-to-3d + rigging provider
//!
//! Turns the sprite into a rigged GLB in two remote tasks: an
//! image-to-3d mesh task, then a rigging task chained on its id. Both
//! are long-running (~2-5 min), so each submit is followed by a poll
//! loop driven through the injected clock.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use spriteforge_core::{ContentHash, ForgeError, Result};
use std::path::Path;
use std::sync::Arc;

use super::http;
use crate::clock::Clock;
use crate::config::ForgeConfig;
use crate::provider::{
    ensure_source_exists, ModelProvider, ModelRequest, ProviderStatus, StageResult,
};
use crate::character::SkeletonKind;

const DEFAULT_MESHY_URL: &str = "https://api.meshy.ai/openapi/v1/image-to-3d";
const RIGGING_URL_SUFFIX: &str = "/rigging";
const POLL_INTERVAL_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_POLL_ATTEMPTS: u32 = 180;

pub struct MeshyProvider {
    api_key: String,
    api_url: String,
    clock: Arc<dyn Clock>,
}

impl MeshyProvider {
    pub fn from_config(config: &ForgeConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let api_key = config
            .api_key("meshy")
            .ok_or_else(|| ForgeError::CredentialMissing("meshy".to_string()))?
            .to_string();

        let api_url = config
            .api_url("meshy")
            .unwrap_or(DEFAULT_MESHY_URL)
            .to_string();

        Ok(Self {
            api_key,
            api_url,
            clock,
        })
    }

    fn auth(&self) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Submit an image-to-3d task, returning its id.
    fn submit_mesh_task(&self, request: &ModelRequest) -> Result<String> {
        let sprite_bytes = std::fs::read(&request.sprite_path)?;
        let image_url = format!("data:image/png;base64,{}", STANDARD.encode(&sprite_bytes));

        let payload = serde_json::json!({
            "image_url": image_url,
            "enable_pbr": true,
            "should_remesh": true,
            "topology": "quad",
        });

        let (header, value) = self.auth();
        let response = http::post_json(
            self.name(),
            &self.api_url,
            (header, &value),
            &payload,
            REQUEST_TIMEOUT_SECS,
        )?;
        parse_submit_response(&response)
    }

    /// Submit a rigging task chained on a finished mesh task.
    fn submit_rig_task(&self, mesh_task_id: &str, skeleton: SkeletonKind) -> Result<String> {
        let payload = serde_json::json!({
            "input_task_id": mesh_task_id,
            "skeleton": skeleton.to_string(),
        });

        let url = format!("{}{}", self.api_url, RIGGING_URL_SUFFIX);
        let (header, value) = self.auth();
        let response = http::post_json(
            self.name(),
            &url,
            (header, &value),
            &payload,
            REQUEST_TIMEOUT_SECS,
        )?;
        parse_submit_response(&response)
    }

    fn poll_task(&self, poll_url: &str) -> Result<TaskState> {
        let (header, value) = self.auth();
        let response = http::get_json(self.name(), poll_url, (header, &value), REQUEST_TIMEOUT_SECS)?;
        Ok(parse_poll_response(&response))
    }

    /// Poll until the task leaves the processing states, sleeping through
    /// the injected clock between attempts.
    fn wait_for_task(&self, poll_url: &str, label: &str) -> Result<String> {
        for _ in 0..MAX_POLL_ATTEMPTS {
            self.clock
                .sleep(std::time::Duration::from_secs(POLL_INTERVAL_SECS));

            match self.poll_task(poll_url)? {
                TaskState::Processing(progress) => {
                    eprintln!("  {} task... {}%", label, progress);
                }
                TaskState::Succeeded { model_url } => {
                    return model_url.ok_or_else(|| {
                        ForgeError::provider("meshy", "No GLB URL in completion response")
                    });
                }
                TaskState::Failed(msg) => {
                    return Err(ForgeError::provider(
                        "meshy",
                        format!("{} task failed: {}", label, msg),
                    ));
                }
            }
        }

        Err(ForgeError::Timeout(format!(
            "Meshy {} task still running after {} poll attempts",
            label, MAX_POLL_ATTEMPTS
        )))
    }
}

/// Remote task lifecycle as reported by the status endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Processing(u8),
    Succeeded { model_url: Option<String> },
    Failed(String),
}

impl ModelProvider for MeshyProvider {
    fn name(&self) -> &str {
        "meshy"
    }

    fn health_check(&self) -> Result<ProviderStatus> {
        if self.api_key.is_empty() {
            return Ok(ProviderStatus::NoApiKey);
        }
        Ok(ProviderStatus::Available)
    }

    fn generate_rigged(&self, request: &ModelRequest, output_dir: &Path) -> Result<StageResult> {
        ensure_source_exists(&request.sprite_path)?;
        std::fs::create_dir_all(output_dir)?;

        let mesh_task_id = self.submit_mesh_task(request)?;
        eprintln!("  Submitted mesh task: {}", mesh_task_id);

        let mesh_poll_url = format!("{}/{}", self.api_url, mesh_task_id);
        let mesh_url = self.wait_for_task(&mesh_poll_url, "mesh")?;

        // Skeleton "none" stops at the unrigged mesh.
        let (model_url, rig_task_id) = if request.skeleton == SkeletonKind::None {
            (mesh_url, None)
        } else {
            let rig_task_id = self.submit_rig_task(&mesh_task_id, request.skeleton)?;
            eprintln!("  Submitted rigging task: {}", rig_task_id);

            let rig_poll_url = format!(
                "{}{}/{}",
                self.api_url, RIGGING_URL_SUFFIX, rig_task_id
            );
            let rigged_url = self.wait_for_task(&rig_poll_url, "rigging")?;
            (rigged_url, Some(rig_task_id))
        };

        let output_path = output_dir.join(format!("{}_rigged.glb", request.name));
        let bytes = http::get_bytes(self.name(), &model_url, REQUEST_TIMEOUT_SECS)?;
        std::fs::write(&output_path, &bytes)?;

        let mut result = StageResult::new(output_path.to_string_lossy(), self.name())
            .with_metadata("mesh_task_id", mesh_task_id)
            .with_metadata("skeleton", request.skeleton.to_string());
        if let Some(rig_id) = rig_task_id {
            result = result.with_metadata("rig_task_id", rig_id);
        }
        result.content_hash = Some(ContentHash::from_bytes(&bytes).to_prefixed_hex());
        Ok(result)
    }
}

/// Extract the task id from a submit response.
pub fn parse_submit_response(response: &serde_json::Value) -> Result<String> {
    response
        .get("result")
        .and_then(|r| r.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            ForgeError::provider(
                "meshy",
                format!(
                    "Unexpected submit response: {}",
                    serde_json::to_string_pretty(response).unwrap_or_default()
                ),
            )
        })
}

/// Interpret a task status response.
pub fn parse_poll_response(response: &serde_json::Value) -> TaskState {
    let status = response
        .get("status")
        .and_then(|s| s.as_str())
        .unwrap_or("UNKNOWN");

    let progress = response
        .get("progress")
        .and_then(|p| p.as_u64())
        .unwrap_or(0) as u8;

    match status {
        "SUCCEEDED" => {
            let model_url = response
                .get("model_urls")
                .and_then(|u| u.get("glb"))
                .and_then(|u| u.as_str())
                .map(|s| s.to_string());
            TaskState::Succeeded { model_url }
        }
        "FAILED" | "EXPIRED" => {
            let msg = response
                .get("task_error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error")
                .to_string();
            TaskState::Failed(msg)
        }
        _ => TaskState::Processing(progress),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submit_response() {
        let response: serde_json::Value =
            serde_json::from_str(r#"{"result":"018d2158-xxxx-yyyy-zzzz-aabbccddee"}"#).unwrap();
        assert_eq!(
            parse_submit_response(&response).unwrap(),
            "018d2158-xxxx-yyyy-zzzz-aabbccddee"
        );
    }

    #[test]
    fn test_parse_submit_response_without_id() {
        let response: serde_json::Value =
            serde_json::from_str(r#"{"message":"invalid image"}"#).unwrap();
        assert!(parse_submit_response(&response).is_err());
    }

    #[test]
    fn test_parse_poll_processing() {
        let response: serde_json::Value =
            serde_json::from_str(r#"{"status":"IN_PROGRESS","progress":42}"#).unwrap();
        assert_eq!(parse_poll_response(&response), TaskState::Processing(42));
    }

    #[test]
    fn test_parse_poll_pending_counts_as_processing() {
        let response: serde_json::Value =
            serde_json::from_str(r#"{"status":"PENDING","progress":0}"#).unwrap();
        assert_eq!(parse_poll_response(&response), TaskState::Processing(0));
    }

    #[test]
    fn test_parse_poll_succeeded() {
        let response: serde_json::Value = serde_json::from_str(
            r#"{
                "status": "SUCCEEDED",
                "progress": 100,
                "model_urls": {
                    "glb": "https://example.com/model.glb",
                    "fbx": "https://example.com/model.fbx"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(
            parse_poll_response(&response),
            TaskState::Succeeded {
                model_url: Some("https://example.com/model.glb".to_string())
            }
        );
    }

    #[test]
    fn test_parse_poll_failed() {
        let response: serde_json::Value = serde_json::from_str(
            r#"{
                "status": "FAILED",
                "progress": 50,
                "task_error": {"message": "Generation failed due to content policy"}
            }"#,
        )
        .unwrap();
        assert_eq!(
            parse_poll_response(&response),
            TaskState::Failed("Generation failed due to content policy".to_string())
        );
    }

    #[test]
    fn test_parse_poll_expired_is_failed() {
        let response: serde_json::Value =
            serde_json::from_str(r#"{"status":"EXPIRED","progress":10}"#).unwrap();
        assert!(matches!(parse_poll_response(&response), TaskState::Failed(_)));
    }
}
