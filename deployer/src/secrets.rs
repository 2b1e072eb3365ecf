//! Where deploy-time secrets come from.
//!
//! Secret values are never part of the stack configuration. They are read
//! by name at deploy time from the process environment (CI secrets) or from
//! a directory of mounted secret files.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Secret '{name}' not found in {source_name}")]
    Missing { name: String, source_name: String },

    #[error("Secret '{name}' is empty")]
    Empty { name: String },

    #[error("Failed to read secret '{name}': {reason}")]
    Unreadable { name: String, reason: String },
}

pub type SecretResult<T> = Result<T, SecretError>;

/// A secret string that does not print itself.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue(***)")
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

pub trait SecretSource: Send + Sync {
    fn get(&self, name: &str) -> SecretResult<SecretValue>;

    fn source_name(&self) -> String;
}

fn non_empty(name: &str, value: String) -> SecretResult<SecretValue> {
    if value.is_empty() {
        return Err(SecretError::Empty {
            name: name.to_string(),
        });
    }
    Ok(SecretValue(value))
}

/// Reads secrets from environment variables of the same name.
#[derive(Debug, Default, Clone)]
pub struct EnvSecretSource;

impl EnvSecretSource {
    pub fn new() -> Self {
        Self
    }
}

impl SecretSource for EnvSecretSource {
    fn get(&self, name: &str) -> SecretResult<SecretValue> {
        match std::env::var(name) {
            Ok(value) => non_empty(name, value),
            Err(std::env::VarError::NotPresent) => Err(SecretError::Missing {
                name: name.to_string(),
                source_name: self.source_name(),
            }),
            Err(e) => Err(SecretError::Unreadable {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn source_name(&self) -> String {
        "environment".to_string()
    }
}

/// Reads `<dir>/<name>`, as laid out by mounted secret volumes.
#[derive(Debug, Clone)]
pub struct FileSecretSource {
    dir: PathBuf,
}

impl FileSecretSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SecretSource for FileSecretSource {
    fn get(&self, name: &str) -> SecretResult<SecretValue> {
        let path = self.dir.join(name);
        match std::fs::read_to_string(&path) {
            Ok(mut value) => {
                // One trailing newline is an artifact of how the file was written.
                if value.ends_with('\n') {
                    value.pop();
                    if value.ends_with('\r') {
                        value.pop();
                    }
                }
                non_empty(name, value)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SecretError::Missing {
                name: name.to_string(),
                source_name: self.source_name(),
            }),
            Err(e) => Err(SecretError::Unreadable {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn source_name(&self) -> String {
        format!("secrets directory {}", self.dir.display())
    }
}
