//! Shared single-attempt HTTP helpers for remote providers
//!
//! Each helper makes exactly one call and maps failures into
//! `ForgeError::Provider`; retry and rate limiting belong to the
//! orchestration layer, never here.

use spriteforge_core::{ForgeError, Result};
use std::time::Duration;

pub(crate) fn build_agent(timeout_secs: u64) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(timeout_secs)))
        .build();
    config.into()
}

fn to_provider_error(provider: &str, e: ureq::Error) -> ForgeError {
    let status = match &e {
        ureq::Error::StatusCode(code) => Some(*code),
        _ => None,
    };
    ForgeError::Provider {
        provider: provider.to_string(),
        status,
        message: e.to_string(),
    }
}

fn parse_failure(provider: &str, e: ureq::Error) -> ForgeError {
    ForgeError::Provider {
        provider: provider.to_string(),
        status: None,
        message: format!("Failed to parse response: {}", e),
    }
}

/// POST a JSON payload with an auth header, parse a JSON response.
pub(crate) fn post_json(
    provider: &str,
    url: &str,
    auth_header: (&str, &str),
    payload: &serde_json::Value,
    timeout_secs: u64,
) -> Result<serde_json::Value> {
    let agent = build_agent(timeout_secs);
    let mut response = agent
        .post(url)
        .header(auth_header.0, auth_header.1)
        .header("Content-Type", "application/json")
        .send_json(payload)
        .map_err(|e| to_provider_error(provider, e))?;

    response
        .body_mut()
        .read_json()
        .map_err(|e| parse_failure(provider, e))
}

/// GET a JSON resource with an auth header.
pub(crate) fn get_json(
    provider: &str,
    url: &str,
    auth_header: (&str, &str),
    timeout_secs: u64,
) -> Result<serde_json::Value> {
    let agent = build_agent(timeout_secs);
    let mut response = agent
        .get(url)
        .header(auth_header.0, auth_header.1)
        .call()
        .map_err(|e| to_provider_error(provider, e))?;

    response
        .body_mut()
        .read_json()
        .map_err(|e| parse_failure(provider, e))
}

/// Download raw bytes, e.g. a generated artifact from a result URL.
pub(crate) fn get_bytes(provider: &str, url: &str, timeout_secs: u64) -> Result<Vec<u8>> {
    let agent = build_agent(timeout_secs);
    let response = agent
        .get(url)
        .call()
        .map_err(|e| to_provider_error(provider, e))?;

    let mut reader = response.into_body().into_reader();
    let mut bytes = Vec::new();
    std::io::Read::read_to_end(&mut reader, &mut bytes).map_err(|e| {
        ForgeError::provider(provider, format!("Failed to read artifact bytes: {}", e))
    })?;
    Ok(bytes)
}
