//! Typed declarations for the Azure resources in the stack.
//!
//! Cross-resource values are expressed as [`Reference`]s so the same
//! declaration can be inspected in tests and rendered into a Pulumi program.

use crate::config::ResourceGroupMode;
use serde_json::{json, Value};

/// A property value that is either known now or resolved by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// A plain string known at declaration time
    Literal(String),
    /// An output property of another declared resource
    Output { resource: String, property: String },
    /// A path into the result of a declared lookup
    Lookup { variable: String, path: String },
    /// A stack configuration value
    Config { key: String },
}

impl Reference {
    pub fn literal(value: impl Into<String>) -> Self {
        Reference::Literal(value.into())
    }

    pub fn output(resource: impl Into<String>, property: impl Into<String>) -> Self {
        Reference::Output {
            resource: resource.into(),
            property: property.into(),
        }
    }

    pub fn lookup(variable: impl Into<String>, path: impl Into<String>) -> Self {
        Reference::Lookup {
            variable: variable.into(),
            path: path.into(),
        }
    }

    pub fn config(key: impl Into<String>) -> Self {
        Reference::Config { key: key.into() }
    }

    /// Name of the declaration this reference points at, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Reference::Literal(_) => None,
            Reference::Output { resource, .. } => Some(resource),
            Reference::Lookup { variable, .. } => Some(variable),
            Reference::Config { key } => Some(key),
        }
    }

    /// Pulumi YAML interpolation syntax. Literal `${` is escaped as `$${`.
    pub fn render(&self) -> String {
        match self {
            Reference::Literal(value) => value.replace("${", "$${"),
            Reference::Output { resource, property } => format!("${{{}.{}}}", resource, property),
            Reference::Lookup { variable, path } => format!("${{{}.{}}}", variable, path),
            Reference::Config { key } => format!("${{{}}}", key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    ResourceGroup,
    StorageAccount,
    FileShare,
    ContainerGroup,
}

impl ResourceKind {
    /// Pulumi type token of the azure-native provider.
    pub fn type_token(&self) -> &'static str {
        match self {
            ResourceKind::ResourceGroup => "azure-native:resources:ResourceGroup",
            ResourceKind::StorageAccount => "azure-native:storage:StorageAccount",
            ResourceKind::FileShare => "azure-native:storage:FileShare",
            ResourceKind::ContainerGroup => "azure-native:containerinstance:ContainerGroup",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::ResourceGroup => write!(f, "resource group"),
            ResourceKind::StorageAccount => write!(f, "storage account"),
            ResourceKind::FileShare => write!(f, "file share"),
            ResourceKind::ContainerGroup => write!(f, "container group"),
        }
    }
}

/// Common surface of every declared resource.
pub trait Resource {
    fn logical_name(&self) -> &str;

    fn kind(&self) -> ResourceKind;

    fn references(&self) -> Vec<&Reference>;

    /// Input properties in the provider's camelCase schema, or `None` when
    /// the provider defaults are enough.
    fn properties(&self) -> Option<Value>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceGroup {
    pub logical_name: String,
    pub mode: ResourceGroupMode,
}

impl ResourceGroup {
    /// Whether the stack owns this group or only refers to it.
    pub fn is_managed(&self) -> bool {
        self.mode == ResourceGroupMode::Create
    }

    /// How other resources refer to the group's name.
    pub fn name_ref(&self) -> Reference {
        match self.mode {
            ResourceGroupMode::Create => Reference::output(&self.logical_name, "name"),
            ResourceGroupMode::Existing => Reference::literal(&self.logical_name),
        }
    }
}

impl Resource for ResourceGroup {
    fn logical_name(&self) -> &str {
        &self.logical_name
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::ResourceGroup
    }

    fn references(&self) -> Vec<&Reference> {
        Vec::new()
    }

    fn properties(&self) -> Option<Value> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    StorageV2,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::StorageV2 => "StorageV2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkuName {
    StandardLrs,
}

impl SkuName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkuName::StandardLrs => "Standard_LRS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageAccount {
    pub logical_name: String,
    pub account_name: String,
    pub allow_blob_public_access: bool,
    pub allow_shared_key_access: bool,
    pub kind: StorageKind,
    pub sku: SkuName,
    pub resource_group_name: Reference,
}

impl StorageAccount {
    pub fn name_ref(&self) -> Reference {
        Reference::output(&self.logical_name, "name")
    }
}

impl Resource for StorageAccount {
    fn logical_name(&self) -> &str {
        &self.logical_name
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::StorageAccount
    }

    fn references(&self) -> Vec<&Reference> {
        vec![&self.resource_group_name]
    }

    fn properties(&self) -> Option<Value> {
        Some(json!({
            "accountName": self.account_name,
            "allowBlobPublicAccess": self.allow_blob_public_access,
            "allowSharedKeyAccess": self.allow_shared_key_access,
            "kind": self.kind.as_str(),
            "resourceGroupName": self.resource_group_name.render(),
            "sku": { "name": self.sku.as_str() },
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileShare {
    pub logical_name: String,
    pub share_name: String,
    pub account_name: Reference,
    pub resource_group_name: Reference,
}

impl FileShare {
    pub fn name_ref(&self) -> Reference {
        Reference::output(&self.logical_name, "name")
    }
}

impl Resource for FileShare {
    fn logical_name(&self) -> &str {
        &self.logical_name
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::FileShare
    }

    fn references(&self) -> Vec<&Reference> {
        vec![&self.account_name, &self.resource_group_name]
    }

    fn properties(&self) -> Option<Value> {
        Some(json!({
            "accountName": self.account_name.render(),
            "resourceGroupName": self.resource_group_name.render(),
            "shareName": self.share_name,
        }))
    }
}

/// `listStorageAccountKeys` invocation feeding the container volume.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageAccountKeys {
    pub variable: String,
    pub resource_group_name: Reference,
    pub account_name: Reference,
}

impl StorageAccountKeys {
    pub const FUNCTION: &'static str = "azure-native:storage:listStorageAccountKeys";

    pub fn first_key(&self) -> Reference {
        Reference::lookup(&self.variable, "keys[0].value")
    }

    pub fn references(&self) -> Vec<&Reference> {
        vec![&self.resource_group_name, &self.account_name]
    }

    pub fn invocation(&self) -> Value {
        json!({
            "fn::invoke": {
                "function": Self::FUNCTION,
                "arguments": {
                    "resourceGroupName": self.resource_group_name.render(),
                    "accountName": self.account_name.render(),
                },
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvValue {
    Plain(String),
    /// Passed as `secureValue`; never shown by the container service
    Secure(Reference),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: EnvValue,
}

impl EnvironmentVariable {
    fn to_value(&self) -> Value {
        match &self.value {
            EnvValue::Plain(value) => json!({ "name": self.name, "value": value }),
            EnvValue::Secure(reference) => {
                json!({ "name": self.name, "secureValue": reference.render() })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRequests {
    pub cpu: f64,
    pub memory_in_gb: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub environment_variables: Vec<EnvironmentVariable>,
    pub ports: Vec<u16>,
    pub resources: ResourceRequests,
    pub volume_mounts: Vec<VolumeMount>,
}

impl Container {
    fn to_value(&self) -> Value {
        json!({
            "name": self.name,
            "image": self.image,
            "environmentVariables": self
                .environment_variables
                .iter()
                .map(EnvironmentVariable::to_value)
                .collect::<Vec<_>>(),
            "ports": self.ports.iter().map(|p| json!({ "port": p })).collect::<Vec<_>>(),
            "resources": {
                "requests": {
                    "cpu": self.resources.cpu,
                    "memoryInGB": self.resources.memory_in_gb,
                }
            },
            "volumeMounts": self
                .volume_mounts
                .iter()
                .map(|m| json!({
                    "mountPath": m.mount_path,
                    "name": m.name,
                    "readOnly": m.read_only,
                }))
                .collect::<Vec<_>>(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublicPort {
    pub port: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IpAddress {
    pub ports: Vec<PublicPort>,
    pub address_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AzureFileVolume {
    pub share_name: Reference,
    pub storage_account_name: Reference,
    pub storage_account_key: Reference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub name: String,
    pub azure_file: AzureFileVolume,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerGroup {
    pub logical_name: String,
    pub resource_group_name: Reference,
    pub os_type: String,
    pub containers: Vec<Container>,
    pub ip_address: IpAddress,
    pub restart_policy: String,
    pub volumes: Vec<Volume>,
}

impl ContainerGroup {
    pub fn volume(&self, name: &str) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.name == name)
    }
}

impl Resource for ContainerGroup {
    fn logical_name(&self) -> &str {
        &self.logical_name
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::ContainerGroup
    }

    fn references(&self) -> Vec<&Reference> {
        let mut refs = vec![&self.resource_group_name];
        for volume in &self.volumes {
            refs.push(&volume.azure_file.share_name);
            refs.push(&volume.azure_file.storage_account_name);
            refs.push(&volume.azure_file.storage_account_key);
        }
        for container in &self.containers {
            for env in &container.environment_variables {
                if let EnvValue::Secure(reference) = &env.value {
                    refs.push(reference);
                }
            }
        }
        refs
    }

    fn properties(&self) -> Option<Value> {
        Some(json!({
            "resourceGroupName": self.resource_group_name.render(),
            "osType": self.os_type,
            "containers": self.containers.iter().map(Container::to_value).collect::<Vec<_>>(),
            "ipAddress": {
                "ports": self
                    .ip_address
                    .ports
                    .iter()
                    .map(|p| json!({ "port": p.port, "protocol": p.protocol }))
                    .collect::<Vec<_>>(),
                "type": self.ip_address.address_type,
            },
            "restartPolicy": self.restart_policy,
            "volumes": self
                .volumes
                .iter()
                .map(|v| json!({
                    "name": v.name,
                    "azureFile": {
                        "shareName": v.azure_file.share_name.render(),
                        "storageAccountName": v.azure_file.storage_account_name.render(),
                        "storageAccountKey": v.azure_file.storage_account_key.render(),
                    },
                }))
                .collect::<Vec<_>>(),
        }))
    }
}

/// Secret stack configuration value declared by the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretParameter {
    /// Project-scoped config key, e.g. `oraclePassword`
    pub key: String,
    /// Environment variable that supplies the value at deploy time
    pub env_name: String,
}

impl SecretParameter {
    pub fn from_env_name(env_name: impl Into<String>) -> Self {
        let env_name = env_name.into();
        Self {
            key: config_key_for_env(&env_name),
            env_name,
        }
    }
}

/// `ORACLE_PASSWORD` -> `oraclePassword`
pub fn config_key_for_env(env_name: &str) -> String {
    let mut key = String::with_capacity(env_name.len());
    let mut upper_next = false;
    for c in env_name.chars() {
        if c == '_' || c == '-' {
            upper_next = !key.is_empty();
            continue;
        }
        if upper_next {
            key.extend(c.to_uppercase());
            upper_next = false;
        } else {
            key.extend(c.to_lowercase());
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_render() {
        assert_eq!(Reference::literal("psworacle1").render(), "psworacle1");
        assert_eq!(
            Reference::output("storageAccount", "name").render(),
            "${storageAccount.name}"
        );
        assert_eq!(
            Reference::lookup("storageAccountKeys", "keys[0].value").render(),
            "${storageAccountKeys.keys[0].value}"
        );
        assert_eq!(Reference::config("oraclePassword").render(), "${oraclePassword}");
    }

    #[test]
    fn test_literal_interpolation_is_escaped() {
        assert_eq!(Reference::literal("a${b}").render(), "a$${b}");
    }

    #[test]
    fn test_reference_target() {
        assert_eq!(Reference::literal("x").target(), None);
        assert_eq!(Reference::output("rg", "name").target(), Some("rg"));
        assert_eq!(Reference::config("k").target(), Some("k"));
    }

    #[test]
    fn test_config_key_for_env() {
        assert_eq!(config_key_for_env("ORACLE_PASSWORD"), "oraclePassword");
        assert_eq!(config_key_for_env("APP_USER_PASSWORD"), "appUserPassword");
        assert_eq!(config_key_for_env("_PASSWORD"), "password");
        assert_eq!(config_key_for_env("password"), "password");
    }

    #[test]
    fn test_resource_group_name_ref() {
        let created = ResourceGroup {
            logical_name: "rg".to_string(),
            mode: ResourceGroupMode::Create,
        };
        assert!(created.is_managed());
        assert_eq!(created.name_ref(), Reference::output("rg", "name"));

        let existing = ResourceGroup {
            logical_name: "shared-rg".to_string(),
            mode: ResourceGroupMode::Existing,
        };
        assert!(!existing.is_managed());
        assert_eq!(existing.name_ref(), Reference::literal("shared-rg"));
    }

    #[test]
    fn test_secure_env_value_rendering() {
        let env = EnvironmentVariable {
            name: "ORACLE_PASSWORD".to_string(),
            value: EnvValue::Secure(Reference::config("oraclePassword")),
        };
        let value = env.to_value();
        assert_eq!(value["secureValue"], "${oraclePassword}");
        assert!(value.get("value").is_none());
    }

    #[test]
    fn test_type_tokens() {
        assert_eq!(
            ResourceKind::ContainerGroup.type_token(),
            "azure-native:containerinstance:ContainerGroup"
        );
        assert_eq!(ResourceKind::FileShare.to_string(), "file share");
    }
}
