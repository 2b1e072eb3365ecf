use crate::secrets::SecretValue;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stack::{PluginSpec, Program};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine binary could not be started
    #[error("Failed to run '{command}': {reason}")]
    Spawn { command: String, reason: String },

    /// The engine ran and reported a failure
    #[error("{message}")]
    CommandFailed { command: String, message: String },

    /// The engine produced output we could not interpret
    #[error("Unexpected output from '{command}': {reason}")]
    InvalidOutput { command: String, reason: String },

    /// A stack operation was attempted before a stack was selected
    #[error("No stack selected")]
    NoStackSelected,

    #[error("Serialization error: {0}")]
    Serialization(#[from] stack::StackError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Receives the engine's progress output one line at a time.
pub type OutputSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// A stack configuration value as handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Plain(String),
    Secret(SecretValue),
}

impl ConfigValue {
    pub fn plain(value: impl Into<String>) -> Self {
        ConfigValue::Plain(value.into())
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, ConfigValue::Secret(_))
    }

    pub fn expose(&self) -> &str {
        match self {
            ConfigValue::Plain(value) => value,
            ConfigValue::Secret(secret) => secret.expose(),
        }
    }
}

/// Per-operation resource change counts of a finished update,
/// e.g. `{"create": 4}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSummary {
    #[serde(rename = "resourceChanges", default)]
    pub resource_changes: BTreeMap<String, u64>,
}

impl UpdateSummary {
    pub fn total_changes(&self) -> u64 {
        self.resource_changes
            .iter()
            .filter(|(op, _)| op.as_str() != "same")
            .map(|(_, count)| count)
            .sum()
    }

    /// The change counts as JSON indented by four spaces.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.resource_changes.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// The external engine that diffs and applies a stack.
///
/// Calls are made strictly in sequence by the deployment driver.
#[async_trait]
pub trait StackEngine: Send + Sync {
    /// Create the stack if it does not exist and make it current, with
    /// `program` as its desired state.
    async fn select_stack(&mut self, program: &Program, stack_name: &str) -> EngineResult<()>;

    async fn install_plugin(&self, plugin: &PluginSpec) -> EngineResult<()>;

    async fn set_config(&self, key: &str, value: &ConfigValue) -> EngineResult<()>;

    /// Reconcile recorded state with the real infrastructure.
    async fn refresh(&self, on_output: OutputSink<'_>) -> EngineResult<()>;

    /// Plan and execute the desired state.
    async fn up(&self, on_output: OutputSink<'_>) -> EngineResult<UpdateSummary>;

    fn engine_name(&self) -> &'static str;
}
