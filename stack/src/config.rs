use crate::error::{StackError, StackResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Whether the resource group is declared by this stack or looked up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceGroupMode {
    /// Declare the group; the engine creates it if it does not exist
    Create,
    /// Reference a group that already exists outside the stack
    Existing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceGroupConfig {
    pub name: String,
    pub mode: ResourceGroupMode,
}

impl Default for ResourceGroupConfig {
    fn default() -> Self {
        Self {
            name: "tf-ktlo-1018-oracle-actions-RG".to_string(),
            mode: ResourceGroupMode::Create,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Logical name of the container group
    pub group_name: String,
    /// Name of the container inside the group
    pub name: String,
    pub image: String,
    /// Environment variable carrying the database password. Only the name is
    /// configured here; the value comes from a secret source at deploy time.
    pub secret_env: String,
    pub exposed_port: u16,
    pub public_port: u16,
    pub protocol: String,
    pub cpu: f64,
    pub memory_gb: f64,
    pub volume_name: String,
    pub mount_path: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            group_name: "containerGroup".to_string(),
            name: "psw-oracle-1".to_string(),
            image: "gvenzl/oracle-xe:21-slim".to_string(),
            secret_env: "ORACLE_PASSWORD".to_string(),
            exposed_port: 1521,
            public_port: 1521,
            protocol: "Tcp".to_string(),
            cpu: 4.0,
            memory_gb: 8.0,
            volume_name: "scripts".to_string(),
            mount_path: "/mnt/scripts".to_string(),
        }
    }
}

/// A provider plugin pinned to an exact version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSpec {
    pub name: String,
    pub version: String,
}

impl PluginSpec {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Provider-scoped config key for the deployment region.
    pub fn location_key(&self) -> String {
        format!("{}:location", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub project_name: String,
    pub stack_name: String,
    pub region: String,
    pub resource_group: ResourceGroupConfig,
    pub storage_account_name: String,
    pub file_share_name: String,
    pub container: ContainerConfig,
    /// Provider plugins installed before any config is set. Only
    /// `azure-native` is pinned by default; further providers such as
    /// `azure` are appended with [`with_plugin`](Self::with_plugin) or a
    /// `[[plugins]]` table, and each one gets the region as `<name>:location`.
    pub plugins: Vec<PluginSpec>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            project_name: "inlineNode".to_string(),
            stack_name: "dev".to_string(),
            region: "West Europe".to_string(),
            resource_group: ResourceGroupConfig::default(),
            storage_account_name: "psworacle1".to_string(),
            file_share_name: "psworacle1".to_string(),
            container: ContainerConfig::default(),
            plugins: vec![PluginSpec::new("azure-native", "v1.65.0")],
        }
    }
}

impl StackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(input: &str) -> StackResult<Self> {
        toml::from_str(input).map_err(|e| StackError::ConfigFile {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> StackResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StackError::ConfigFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| StackError::ConfigFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn with_stack_name(mut self, stack_name: impl Into<String>) -> Self {
        self.stack_name = stack_name.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.container.image = image.into();
        self
    }

    pub fn with_existing_resource_group(mut self, name: impl Into<String>) -> Self {
        self.resource_group = ResourceGroupConfig {
            name: name.into(),
            mode: ResourceGroupMode::Existing,
        };
        self
    }

    /// Sets the container port and the public IP port together.
    pub fn with_port(mut self, port: u16) -> Self {
        self.container.exposed_port = port;
        self.container.public_port = port;
        self
    }

    pub fn with_ports(mut self, exposed_port: u16, public_port: u16) -> Self {
        self.container.exposed_port = exposed_port;
        self.container.public_port = public_port;
        self
    }

    pub fn with_plugin(mut self, plugin: PluginSpec) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn validate(&self) -> StackResult<()> {
        let required = [
            ("project_name", &self.project_name),
            ("stack_name", &self.stack_name),
            ("region", &self.region),
            ("resource_group.name", &self.resource_group.name),
            ("storage_account_name", &self.storage_account_name),
            ("file_share_name", &self.file_share_name),
            ("container.group_name", &self.container.group_name),
            ("container.name", &self.container.name),
            ("container.image", &self.container.image),
            ("container.secret_env", &self.container.secret_env),
            ("container.protocol", &self.container.protocol),
            ("container.volume_name", &self.container.volume_name),
            ("container.mount_path", &self.container.mount_path),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(StackError::invalid(format!("{} cannot be empty", field)));
            }
        }

        if self.container.exposed_port == 0 || self.container.public_port == 0 {
            return Err(StackError::invalid("Ports must be greater than 0"));
        }

        if !(self.container.cpu.is_finite() && self.container.cpu > 0.0) {
            return Err(StackError::invalid("CPU request must be greater than 0"));
        }

        if !(self.container.memory_gb.is_finite() && self.container.memory_gb > 0.0) {
            return Err(StackError::invalid(
                "Memory request must be greater than 0",
            ));
        }

        if !self.container.mount_path.starts_with('/') {
            return Err(StackError::invalid("Mount path must be absolute"));
        }

        if self.plugins.is_empty() {
            return Err(StackError::invalid("At least one plugin is required"));
        }

        for plugin in &self.plugins {
            if plugin.name.trim().is_empty() {
                return Err(StackError::invalid("Plugin name cannot be empty"));
            }
            if !is_pinned_version(&plugin.version) {
                return Err(StackError::invalid(format!(
                    "Plugin '{}' must be pinned to an exact version, got '{}'",
                    plugin.name, plugin.version
                )));
            }
        }

        Ok(())
    }
}

// Accepts `v1.65.0`, `1.65.0` and pre-release suffixes such as `v2.0.0-beta.1`.
fn is_pinned_version(version: &str) -> bool {
    let version = version.strip_prefix('v').unwrap_or(version);
    let core = version.split_once('-').map_or(version, |(core, _)| core);
    let parts: Vec<&str> = core.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}
