//! Ordered deployment of a stack through a [`StackEngine`].
//!
//! select stack -> install plugins -> set config -> refresh -> up.
//! Each step is awaited before the next one starts and the first failure
//! aborts the run. Nothing is retried or rolled back.

use crate::engine::{ConfigValue, EngineError, StackEngine, UpdateSummary};
use crate::secrets::{SecretError, SecretSource};
use stack::{build_stack, Program, StackConfig, StackDefinition, StackError};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Secret(#[from] SecretError),
}

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    SelectStack,
    InstallPlugins,
    SetConfig,
    Refresh,
    Up,
}

impl std::fmt::Display for DeployStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployStep::SelectStack => write!(f, "select stack"),
            DeployStep::InstallPlugins => write!(f, "install plugins"),
            DeployStep::SetConfig => write!(f, "set config"),
            DeployStep::Refresh => write!(f, "refresh"),
            DeployStep::Up => write!(f, "up"),
        }
    }
}

type LineHandler = Box<dyn Fn(&str) + Send + Sync>;

pub struct DeploymentDriver<E: StackEngine> {
    engine: E,
    secrets: Box<dyn SecretSource>,
    on_output: LineHandler,
    completed: Vec<DeployStep>,
    in_progress: Option<DeployStep>,
}

impl<E: StackEngine> DeploymentDriver<E> {
    /// Engine output is echoed to stdout unless replaced with
    /// [`with_output`](Self::with_output).
    pub fn new(engine: E, secrets: Box<dyn SecretSource>) -> Self {
        Self {
            engine,
            secrets,
            on_output: Box::new(|line: &str| println!("{}", line)),
            completed: Vec::new(),
            in_progress: None,
        }
    }

    pub fn with_output(mut self, on_output: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_output = Box::new(on_output);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Steps that finished during the last [`deploy`](Self::deploy).
    pub fn completed_steps(&self) -> &[DeployStep] {
        &self.completed
    }

    /// The engine step a failed deploy stopped at. `None` after a success,
    /// or when the run failed before the engine was called.
    pub fn failed_step(&self) -> Option<DeployStep> {
        self.in_progress
    }

    fn begin(&mut self, step: DeployStep) {
        self.in_progress = Some(step);
    }

    fn finish(&mut self, step: DeployStep) {
        self.completed.push(step);
        self.in_progress = None;
    }

    /// Config values in the order they are set: the region once per
    /// provider plugin, then each declared secret.
    pub fn config_values(
        &self,
        config: &StackConfig,
        definition: &StackDefinition,
    ) -> DriverResult<Vec<(String, ConfigValue)>> {
        let mut values: Vec<(String, ConfigValue)> = config
            .plugins
            .iter()
            .map(|p| (p.location_key(), ConfigValue::plain(&config.region)))
            .collect();

        for secret in &definition.secrets {
            let value = self.secrets.get(&secret.env_name)?;
            if value.expose().is_empty() {
                return Err(SecretError::Empty {
                    name: secret.env_name.clone(),
                }
                .into());
            }
            values.push((secret.key.clone(), ConfigValue::Secret(value)));
        }

        Ok(values)
    }

    pub async fn deploy(&mut self, config: &StackConfig) -> DriverResult<UpdateSummary> {
        self.completed.clear();
        self.in_progress = None;
        let definition = build_stack(config)?;
        let program = Program::from_definition(&definition);
        let config_values = self.config_values(config, &definition)?;

        self.begin(DeployStep::SelectStack);
        self.engine
            .select_stack(&program, &definition.stack_name)
            .await?;
        info!(
            "Initialized stack {} using {}",
            definition.stack_name,
            self.engine.engine_name()
        );
        self.finish(DeployStep::SelectStack);

        self.begin(DeployStep::InstallPlugins);
        info!("Installing plugins...");
        for plugin in &config.plugins {
            self.engine.install_plugin(plugin).await?;
            info!("Installed plugin {} {}", plugin.name, plugin.version);
        }
        self.finish(DeployStep::InstallPlugins);

        self.begin(DeployStep::SetConfig);
        info!("Setting up config");
        for (key, value) in &config_values {
            self.engine.set_config(key, value).await?;
            if value.is_secret() {
                info!("Set secret config {}", key);
            } else {
                info!("Set config {} = {}", key, value.expose());
            }
        }
        self.finish(DeployStep::SetConfig);

        self.begin(DeployStep::Refresh);
        info!("Refreshing stack...");
        self.engine.refresh(self.on_output.as_ref()).await?;
        info!("Refresh complete");
        self.finish(DeployStep::Refresh);

        self.begin(DeployStep::Up);
        info!("Updating stack...");
        let summary = self.engine.up(self.on_output.as_ref()).await?;
        info!("Update complete with {} changes", summary.total_changes());
        self.finish(DeployStep::Up);

        Ok(summary)
    }
}
