use stack::prelude::*;
use std::io::Write;

#[test]
fn test_default_stack_end_to_end() {
    let config = StackConfig::new()
        .with_region("West Europe")
        .with_image("gvenzl/oracle-xe:21-slim");
    let definition = build_stack(&config).unwrap();

    let kinds: Vec<ResourceKind> = definition.nodes().iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ResourceKind::ResourceGroup,
            ResourceKind::StorageAccount,
            ResourceKind::FileShare,
            ResourceKind::ContainerGroup,
        ]
    );

    let program = Program::from_definition(&definition);
    assert_eq!(program.resources.len(), 4);
    assert_eq!(program.variables.len(), 1);
}

#[test]
fn test_config_file_variant() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
stack_name = "oracle-1527"

[resource_group]
name = "tf-ktlo-1018-oracle-actions-RG"
mode = "existing"

[container]
exposed_port = 1527
public_port = 80
"#
    )
    .unwrap();

    let config = StackConfig::load(file.path()).unwrap();
    let definition = StackBuilder::new(config).build().unwrap();

    assert_eq!(definition.stack_name, "oracle-1527");
    assert!(!definition.resource_group.is_managed());
    assert_eq!(definition.container_group.containers[0].ports, vec![1527]);
    assert_eq!(definition.container_group.ip_address.ports[0].port, 80);

    let yaml = Program::from_definition(&definition).to_yaml().unwrap();
    assert!(!yaml.contains("azure-native:resources:ResourceGroup"));
    assert!(yaml.contains("tf-ktlo-1018-oracle-actions-RG"));
}

#[test]
fn test_invalid_config_file_reports_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "region = [").unwrap();

    let err = StackConfig::load(file.path()).unwrap_err();
    assert!(err.to_string().contains(&file.path().display().to_string()));
}
