use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to read config file '{path}': {reason}")]
    ConfigFile { path: String, reason: String },

    #[error("Duplicate resource name: {name}")]
    DuplicateResource { name: String },

    #[error("Resource '{resource}' references undeclared '{target}'")]
    DanglingReference { resource: String, target: String },

    #[error("Volume mount '{mount}' in container '{container}' has no matching volume")]
    VolumeMismatch { container: String, mount: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),
}

pub type StackResult<T> = Result<T, StackError>;

impl StackError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        StackError::InvalidConfig {
            message: message.into(),
        }
    }
}
