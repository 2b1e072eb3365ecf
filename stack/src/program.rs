//! Rendering a [`StackDefinition`] as a Pulumi YAML program.
//!
//! The engine reads the result as `Pulumi.yaml` from the stack's work
//! directory. Secret values never appear in the program; only their config
//! declarations do.

use crate::error::StackResult;
use crate::graph::StackDefinition;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub const PROGRAM_FILE: &str = "Pulumi.yaml";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigDeclaration {
    #[serde(rename = "type")]
    pub value_type: String,
    pub secret: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceDeclaration {
    #[serde(rename = "type")]
    pub type_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub name: String,
    pub runtime: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, ConfigDeclaration>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, Value>,
    pub resources: BTreeMap<String, ResourceDeclaration>,
}

impl Program {
    pub fn from_definition(definition: &StackDefinition) -> Self {
        let config = definition
            .secrets
            .iter()
            .map(|s| {
                (
                    s.key.clone(),
                    ConfigDeclaration {
                        value_type: "string".to_string(),
                        secret: true,
                    },
                )
            })
            .collect();

        let mut variables = BTreeMap::new();
        variables.insert(
            definition.storage_keys.variable.clone(),
            definition.storage_keys.invocation(),
        );

        let resources = definition
            .managed_resources()
            .into_iter()
            .map(|r| {
                (
                    r.logical_name().to_string(),
                    ResourceDeclaration {
                        type_token: r.kind().type_token().to_string(),
                        properties: r.properties(),
                    },
                )
            })
            .collect();

        Self {
            name: definition.project_name.clone(),
            runtime: "yaml".to_string(),
            config,
            variables,
            resources,
        }
    }

    pub fn to_yaml(&self) -> StackResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_stack;
    use crate::config::StackConfig;

    fn default_program() -> Program {
        Program::from_definition(&build_stack(&StackConfig::default()).unwrap())
    }

    #[test]
    fn test_program_header() {
        let program = default_program();
        assert_eq!(program.name, "inlineNode");
        assert_eq!(program.runtime, "yaml");
        assert!(program.config["oraclePassword"].secret);
    }

    #[test]
    fn test_program_resources() {
        let program = default_program();
        assert_eq!(program.resources.len(), 4);

        let rg = &program.resources["tf-ktlo-1018-oracle-actions-RG"];
        assert_eq!(rg.type_token, "azure-native:resources:ResourceGroup");
        assert!(rg.properties.is_none());

        let account = program.resources["storageAccount"].properties.as_ref().unwrap();
        assert_eq!(account["allowBlobPublicAccess"], false);
        assert_eq!(account["allowSharedKeyAccess"], true);
        assert_eq!(account["sku"]["name"], "Standard_LRS");
        assert_eq!(
            account["resourceGroupName"],
            "${tf-ktlo-1018-oracle-actions-RG.name}"
        );

        let share = program.resources["fileShare"].properties.as_ref().unwrap();
        assert_eq!(share["accountName"], "${storageAccount.name}");
    }

    #[test]
    fn test_container_group_properties() {
        let program = default_program();
        let group = program.resources["containerGroup"].properties.as_ref().unwrap();

        assert_eq!(group["osType"], "Linux");
        assert_eq!(group["restartPolicy"], "always");
        assert_eq!(group["ipAddress"]["type"], "Public");
        assert_eq!(group["ipAddress"]["ports"][0]["port"], 1521);

        let container = &group["containers"][0];
        assert_eq!(container["image"], "gvenzl/oracle-xe:21-slim");
        assert_eq!(container["resources"]["requests"]["cpu"], 4.0);
        assert_eq!(container["resources"]["requests"]["memoryInGB"], 8.0);
        assert_eq!(
            container["environmentVariables"][0]["secureValue"],
            "${oraclePassword}"
        );
        assert_eq!(container["volumeMounts"][0]["name"], "scripts");

        let volume = &group["volumes"][0];
        assert_eq!(volume["name"], "scripts");
        assert_eq!(
            volume["azureFile"]["storageAccountKey"],
            "${storageAccountKeys.keys[0].value}"
        );
    }

    #[test]
    fn test_key_lookup_variable() {
        let program = default_program();
        let invoke = &program.variables["storageAccountKeys"]["fn::invoke"];
        assert_eq!(invoke["function"], "azure-native:storage:listStorageAccountKeys");
        assert_eq!(invoke["arguments"]["accountName"], "${storageAccount.name}");
    }

    #[test]
    fn test_existing_resource_group_renders_literal() {
        let config = StackConfig::default().with_existing_resource_group("shared-rg");
        let program = Program::from_definition(&build_stack(&config).unwrap());

        assert_eq!(program.resources.len(), 3);
        assert!(!program.resources.contains_key("shared-rg"));
        let account = program.resources["storageAccount"].properties.as_ref().unwrap();
        assert_eq!(account["resourceGroupName"], "shared-rg");
    }

    #[test]
    fn test_yaml_output() {
        let yaml = default_program().to_yaml().unwrap();
        assert!(yaml.contains("runtime: yaml"));
        assert!(yaml.contains("type: azure-native:storage:FileShare"));
        assert!(yaml.contains("fn::invoke"));
        assert!(!yaml.contains("Welcome1"));

        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed["name"].as_str(), Some("inlineNode"));
        assert_eq!(
            parsed["resources"]["containerGroup"]["properties"]["volumes"][0]["name"].as_str(),
            Some("scripts")
        );
    }
}
