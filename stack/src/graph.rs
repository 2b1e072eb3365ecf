//! The desired-state resource graph for one stack.

use crate::error::{StackError, StackResult};
use crate::resource::{
    ContainerGroup, FileShare, Reference, Resource, ResourceGroup, ResourceKind,
    SecretParameter, StorageAccount, StorageAccountKeys,
};
use std::collections::HashSet;

/// A declared node as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    pub logical_name: String,
    pub kind: ResourceKind,
    /// False for resources the stack refers to but does not own
    pub managed: bool,
}

/// `from` cannot be created before `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackDefinition {
    pub project_name: String,
    pub stack_name: String,
    pub resource_group: ResourceGroup,
    pub storage_account: StorageAccount,
    pub storage_keys: StorageAccountKeys,
    pub file_share: FileShare,
    pub container_group: ContainerGroup,
    pub secrets: Vec<SecretParameter>,
}

impl StackDefinition {
    fn resources(&self) -> [&dyn Resource; 4] {
        [
            &self.resource_group,
            &self.storage_account,
            &self.file_share,
            &self.container_group,
        ]
    }

    pub fn nodes(&self) -> Vec<ResourceNode> {
        self.resources()
            .into_iter()
            .map(|r| ResourceNode {
                logical_name: r.logical_name().to_string(),
                kind: r.kind(),
                managed: r.kind() != ResourceKind::ResourceGroup
                    || self.resource_group.is_managed(),
            })
            .collect()
    }

    /// Resources the engine has to create, in declaration order.
    pub fn managed_resources(&self) -> Vec<&dyn Resource> {
        self.resources()
            .into_iter()
            .filter(|r| {
                r.kind() != ResourceKind::ResourceGroup || self.resource_group.is_managed()
            })
            .collect()
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.nodes().iter().filter(|n| n.kind == kind).count()
    }

    /// Edges between declared resources. References that go through the
    /// storage key lookup expand to whatever the lookup itself references.
    pub fn dependencies(&self) -> Vec<Dependency> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();

        for resource in self.resources() {
            for target in self.resolve_targets(resource.references()) {
                let edge = Dependency {
                    from: resource.logical_name().to_string(),
                    to: target,
                };
                if seen.insert(edge.clone()) {
                    edges.push(edge);
                }
            }
        }

        edges
    }

    pub fn dependencies_of(&self, logical_name: &str) -> Vec<String> {
        self.dependencies()
            .into_iter()
            .filter(|d| d.from == logical_name)
            .map(|d| d.to)
            .collect()
    }

    fn resolve_targets(&self, refs: Vec<&Reference>) -> Vec<String> {
        let mut targets = Vec::new();
        for reference in refs {
            match reference {
                Reference::Output { resource, .. } => targets.push(resource.clone()),
                Reference::Lookup { variable, .. } if *variable == self.storage_keys.variable => {
                    for inner in self.storage_keys.references() {
                        if let Reference::Output { resource, .. } = inner {
                            targets.push(resource.clone());
                        }
                    }
                }
                _ => {}
            }
        }
        targets
    }

    pub fn validate(&self) -> StackResult<()> {
        let mut names = HashSet::new();
        let declared = self
            .resources()
            .into_iter()
            .map(|r| r.logical_name().to_string())
            .chain(std::iter::once(self.storage_keys.variable.clone()))
            .chain(self.secrets.iter().map(|s| s.key.clone()));
        for name in declared {
            if !names.insert(name.clone()) {
                return Err(StackError::DuplicateResource { name });
            }
        }

        let managed: HashSet<&str> = self
            .managed_resources()
            .into_iter()
            .map(|r| r.logical_name())
            .collect();

        let mut checks: Vec<(&str, Vec<&Reference>)> = self
            .resources()
            .into_iter()
            .map(|r| (r.logical_name(), r.references()))
            .collect();
        checks.push((self.storage_keys.variable.as_str(), self.storage_keys.references()));

        for (owner, refs) in checks {
            for reference in refs {
                let resolved = match reference {
                    Reference::Literal(_) => true,
                    Reference::Output { resource, .. } => managed.contains(resource.as_str()),
                    Reference::Lookup { variable, .. } => *variable == self.storage_keys.variable,
                    Reference::Config { key } => self.secrets.iter().any(|s| s.key == *key),
                };
                if !resolved {
                    return Err(StackError::DanglingReference {
                        resource: owner.to_string(),
                        target: reference.target().unwrap_or_default().to_string(),
                    });
                }
            }
        }

        for container in &self.container_group.containers {
            for mount in &container.volume_mounts {
                if self.container_group.volume(&mount.name).is_none() {
                    return Err(StackError::VolumeMismatch {
                        container: container.name.clone(),
                        mount: mount.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
