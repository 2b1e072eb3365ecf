pub mod ci;
pub mod driver;
pub mod engine;
pub mod pulumi;
pub mod secrets;

pub use driver::{DeployStep, DeploymentDriver, DriverError, DriverResult};
pub use engine::{
    ConfigValue, EngineError, EngineResult, OutputSink, StackEngine, UpdateSummary,
};
pub use pulumi::PulumiCli;
pub use secrets::{
    EnvSecretSource, FileSecretSource, SecretError, SecretResult, SecretSource, SecretValue,
};
