//! The language model seam: a prompt in, text out, plus helpers that turn
//! free-form completions into schema-checked values.
//!
//! Production runs talk to an external CLI tool that reads the prompt on
//! stdin and prints the completion on stdout. Everything above this module
//! is generic over [`Model`], so tests script completions instead.

pub mod prompt;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::Draft;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::io::config::ModelConfig;
use crate::io::process::run_command_with_timeout;

/// A single request to the model. Prompts are fully rendered before they
/// reach this type; nothing below the prompt engine does templating.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub prompt: String,
}

impl ModelRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// The model returned text that does not decode into the value the caller
/// asked for. Unlike a failing test run this is not evidence about the code
/// under repair, so callers let it propagate instead of absorbing it.
#[derive(Debug, Error)]
#[error("model returned malformed structured output: {reason}; response begins: {excerpt:?}")]
pub struct StructuredOutputError {
    pub reason: String,
    pub excerpt: String,
}

impl StructuredOutputError {
    fn new(reason: impl Into<String>, response: &str) -> Self {
        let excerpt: String = response.chars().take(200).collect();
        Self {
            reason: reason.into(),
            excerpt,
        }
    }
}

pub trait Model {
    fn complete(&self, request: &ModelRequest) -> Result<String>;
}

/// Runs a configured command per completion, feeding the prompt on stdin.
#[derive(Debug, Clone)]
pub struct CliModel {
    config: ModelConfig,
}

impl CliModel {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }
}

impl Model for CliModel {
    #[instrument(skip_all, fields(prompt_bytes = request.prompt.len()))]
    fn complete(&self, request: &ModelRequest) -> Result<String> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| anyhow!("model command is empty"))?;
        let mut cmd = std::process::Command::new(program);
        cmd.args(args);

        let output = run_command_with_timeout(
            cmd,
            Some(request.prompt.as_bytes()),
            self.config.timeout(),
            self.config.output_limit_bytes,
        )
        .with_context(|| format!("run model command {program:?}"))?;

        if output.timed_out {
            bail!(
                "model command timed out after {}s",
                self.config.timeout_secs
            );
        }
        if !output.status.success() {
            bail!(
                "model command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        debug!(bytes = output.stdout.len(), "model completion received");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Decode a completion into `T`, validating the embedded JSON against
/// `schema` first.
///
/// Models wrap JSON in prose and code fences, so this takes the outermost
/// `{..}` span of the response rather than parsing it whole. Failures are
/// [`StructuredOutputError`] behind `anyhow`, downcastable by callers that
/// need to tell a malformed reply from an infrastructure error.
pub fn parse_structured<T: DeserializeOwned>(response: &str, schema: &str) -> Result<T> {
    let fragment = extract_json(response)
        .ok_or_else(|| StructuredOutputError::new("no JSON object found", response))?;
    let value: serde_json::Value = serde_json::from_str(fragment)
        .map_err(|e| StructuredOutputError::new(format!("invalid JSON: {e}"), response))?;

    let violations = schema_violations(&value, schema)?;
    if !violations.is_empty() {
        return Err(StructuredOutputError::new(
            format!("schema violations: {}", violations.join("; ")),
            response,
        )
        .into());
    }

    let parsed = serde_json::from_value(value)
        .map_err(|e| StructuredOutputError::new(format!("unexpected shape: {e}"), response))?;
    Ok(parsed)
}

/// Request a completion and decode it in one step.
pub fn complete_structured<M: Model + ?Sized, T: DeserializeOwned>(
    model: &M,
    request: &ModelRequest,
    schema: &str,
) -> Result<T> {
    let response = model.complete(request)?;
    parse_structured(&response, schema)
}

fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

fn schema_violations(value: &serde_json::Value, schema: &str) -> Result<Vec<String>> {
    let schema: serde_json::Value =
        serde_json::from_str(schema).context("parse response schema")?;
    let validator = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile response schema")?;
    Ok(validator
        .iter_errors(value)
        .map(|err| format!("{}: {}", err.instance_path(), err))
        .collect())
}
