pub mod builder;
pub mod config;
pub mod error;
pub mod graph;
pub mod program;
pub mod resource;

pub use builder::{build_stack, StackBuilder};
pub use config::{ContainerConfig, PluginSpec, ResourceGroupConfig, ResourceGroupMode, StackConfig};
pub use error::{StackError, StackResult};
pub use graph::{Dependency, ResourceNode, StackDefinition};
pub use program::{Program, PROGRAM_FILE};
pub use resource::{
    config_key_for_env, AzureFileVolume, Container, ContainerGroup, EnvValue,
    EnvironmentVariable, FileShare, IpAddress, PublicPort, Reference, Resource, ResourceGroup,
    ResourceKind, ResourceRequests, SecretParameter, SkuName, StorageAccount,
    StorageAccountKeys, StorageKind, Volume, VolumeMount,
};

pub mod prelude {
    pub use crate::builder::*;
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::graph::*;
    pub use crate::program::*;
    pub use crate::resource::*;
}
