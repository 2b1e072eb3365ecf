use crate::config::StackConfig;
use crate::error::StackResult;
use crate::graph::StackDefinition;
use crate::resource::{
    AzureFileVolume, Container, ContainerGroup, EnvValue, EnvironmentVariable, FileShare,
    IpAddress, PublicPort, Reference, ResourceGroup, ResourceRequests, SecretParameter, SkuName,
    StorageAccount, StorageAccountKeys, StorageKind, Volume, VolumeMount,
};
use tracing::debug;

const STORAGE_ACCOUNT: &str = "storageAccount";
const STORAGE_KEYS: &str = "storageAccountKeys";
const FILE_SHARE: &str = "fileShare";

/// Assembles the resource graph for one stack from a [`StackConfig`].
pub struct StackBuilder {
    config: StackConfig,
}

impl StackBuilder {
    pub fn new(config: StackConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub fn build(&self) -> StackResult<StackDefinition> {
        self.config.validate()?;
        let config = &self.config;

        let resource_group = ResourceGroup {
            logical_name: config.resource_group.name.clone(),
            mode: config.resource_group.mode,
        };
        let rg_name = resource_group.name_ref();

        let storage_account = StorageAccount {
            logical_name: STORAGE_ACCOUNT.to_string(),
            account_name: config.storage_account_name.clone(),
            allow_blob_public_access: false,
            allow_shared_key_access: true,
            kind: StorageKind::StorageV2,
            sku: SkuName::StandardLrs,
            resource_group_name: rg_name.clone(),
        };

        let storage_keys = StorageAccountKeys {
            variable: STORAGE_KEYS.to_string(),
            resource_group_name: rg_name.clone(),
            account_name: storage_account.name_ref(),
        };

        let file_share = FileShare {
            logical_name: FILE_SHARE.to_string(),
            share_name: config.file_share_name.clone(),
            account_name: storage_account.name_ref(),
            resource_group_name: rg_name.clone(),
        };

        let secret = SecretParameter::from_env_name(&config.container.secret_env);
        let container = Container {
            name: config.container.name.clone(),
            image: config.container.image.clone(),
            environment_variables: vec![EnvironmentVariable {
                name: secret.env_name.clone(),
                value: EnvValue::Secure(Reference::config(&secret.key)),
            }],
            ports: vec![config.container.exposed_port],
            resources: ResourceRequests {
                cpu: config.container.cpu,
                memory_in_gb: config.container.memory_gb,
            },
            volume_mounts: vec![VolumeMount {
                name: config.container.volume_name.clone(),
                mount_path: config.container.mount_path.clone(),
                read_only: false,
            }],
        };

        let container_group = ContainerGroup {
            logical_name: config.container.group_name.clone(),
            resource_group_name: rg_name,
            os_type: "Linux".to_string(),
            containers: vec![container],
            ip_address: IpAddress {
                ports: vec![PublicPort {
                    port: config.container.public_port,
                    protocol: config.container.protocol.clone(),
                }],
                address_type: "Public".to_string(),
            },
            restart_policy: "always".to_string(),
            volumes: vec![Volume {
                name: config.container.volume_name.clone(),
                azure_file: AzureFileVolume {
                    share_name: file_share.name_ref(),
                    storage_account_name: storage_account.name_ref(),
                    storage_account_key: storage_keys.first_key(),
                },
            }],
        };

        let definition = StackDefinition {
            project_name: config.project_name.clone(),
            stack_name: config.stack_name.clone(),
            resource_group,
            storage_account,
            storage_keys,
            file_share,
            container_group,
            secrets: vec![secret],
        };

        definition.validate()?;
        debug!(
            "Built stack definition {}/{} with {} resources",
            definition.project_name,
            definition.stack_name,
            definition.nodes().len()
        );

        Ok(definition)
    }
}

pub fn build_stack(config: &StackConfig) -> StackResult<StackDefinition> {
    StackBuilder::new(config.clone()).build()
}
