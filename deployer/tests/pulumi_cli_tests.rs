//! Drives `PulumiCli` against a stand-in `pulumi` script that records its
//! arguments and answers `stack history` with a canned update.
#![cfg(unix)]

use deployer::{DeploymentDriver, FileSecretSource, PulumiCli, StackEngine};
use serial_test::serial;
use stack::{build_stack, Program, StackConfig};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const FAKE_PULUMI: &str = r#"#!/bin/sh
echo "$*" >> "$FAKE_PULUMI_LOG"
case "$*" in
  *"config set"*"--secret"*)
    cat > "$FAKE_PULUMI_SECRET"
    ;;
  *"stack history"*)
    echo '[{"kind":"update","result":"succeeded","resourceChanges":{"create":4}}]'
    ;;
  *" refresh "*)
    if [ "$FAKE_PULUMI_MODE" = "raw-bytes" ]; then
      printf 'Refreshing \377 (dev)\n'
      exit 0
    fi
    echo "Refreshing (dev)"
    ;;
  *" up "*)
    if [ "$FAKE_PULUMI_MODE" = "fail-up" ]; then
      echo "error: update failed: quota exceeded" >&2
      exit 1
    fi
    if [ "$FAKE_PULUMI_MODE" = "fail-up-raw-bytes" ]; then
      printf 'error: disk \377 full\n' >&2
      exit 1
    fi
    echo "Updating (dev)"
    echo "Resources: 4 created"
    ;;
esac
exit 0
"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("pulumi");
        std::fs::write(&script, FAKE_PULUMI).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let secrets = dir.path().join("secrets");
        std::fs::create_dir(&secrets).unwrap();
        std::fs::write(secrets.join("ORACLE_PASSWORD"), "from-secret-store\n").unwrap();

        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn engine(&self, mode: Option<&str>) -> PulumiCli {
        PulumiCli::new()
            .unwrap()
            .with_binary(self.path("pulumi"))
            .with_work_dir(self.path("project"))
            .with_env("FAKE_PULUMI_LOG", self.path("calls.log").display().to_string())
            .with_env("FAKE_PULUMI_SECRET", self.path("secret.txt").display().to_string())
            .with_env("FAKE_PULUMI_MODE", mode.unwrap_or(""))
    }

    fn calls(&self) -> Vec<String> {
        read_lines(&self.path("calls.log"))
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
#[serial]
async fn test_deploy_through_cli() {
    let fixture = Fixture::new();
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);

    let mut driver = DeploymentDriver::new(
        fixture.engine(None),
        Box::new(FileSecretSource::new(fixture.path("secrets"))),
    )
    .with_output(move |line| sink.lock().unwrap().push(line.to_string()));

    let summary = driver.deploy(&StackConfig::default()).await.unwrap();
    assert_eq!(summary.resource_changes["create"], 4);

    let program = std::fs::read_to_string(fixture.path("project").join("Pulumi.yaml")).unwrap();
    assert!(program.contains("runtime: yaml"));
    assert!(!program.contains("from-secret-store"));

    let calls = fixture.calls();
    let subcommands: Vec<String> = calls
        .iter()
        .map(|c| {
            let rest = c.split_once("project ").map(|(_, rest)| rest).unwrap_or(c);
            rest.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
        })
        .collect();
    assert_eq!(
        subcommands,
        vec![
            "stack select",
            "plugin install",
            "config set",
            "config set",
            "refresh --stack",
            "up --stack",
            "stack history",
        ]
    );
    assert!(calls.iter().all(|c| c.starts_with("--non-interactive --cwd ")));
    assert!(calls[1].ends_with("plugin install resource azure-native v1.65.0"));
    assert!(calls[2].ends_with("--plaintext azure-native:location -- West Europe"));
    assert!(calls[3].ends_with("--secret oraclePassword"));
    assert!(calls.iter().all(|c| !c.contains("from-secret-store")));

    let secret = std::fs::read_to_string(fixture.path("secret.txt")).unwrap();
    assert_eq!(secret, "from-secret-store");

    assert_eq!(
        *lines.lock().unwrap(),
        vec![
            "Refreshing (dev)".to_string(),
            "Updating (dev)".to_string(),
            "Resources: 4 created".to_string(),
        ]
    );
}

#[tokio::test]
#[serial]
async fn test_failed_up_reports_stderr_once() {
    let fixture = Fixture::new();
    let mut driver = DeploymentDriver::new(
        fixture.engine(Some("fail-up")),
        Box::new(FileSecretSource::new(fixture.path("secrets"))),
    )
    .with_output(|_| {});

    let err = driver.deploy(&StackConfig::default()).await.unwrap_err();

    assert_eq!(err.to_string(), "error: update failed: quota exceeded");
    let calls = fixture.calls();
    assert_eq!(calls.iter().filter(|c| c.contains(" up --stack")).count(), 1);
    assert!(calls.iter().all(|c| !c.contains("stack history")));
}

#[tokio::test]
#[serial]
async fn test_non_utf8_output_is_echoed_lossily() {
    let fixture = Fixture::new();
    let program = Program::from_definition(&build_stack(&StackConfig::default()).unwrap());
    let mut engine = fixture.engine(Some("raw-bytes"));
    engine.select_stack(&program, "dev").await.unwrap();

    let lines = Mutex::new(Vec::new());
    let sink = |line: &str| lines.lock().unwrap().push(line.to_string());
    engine.refresh(&sink).await.unwrap();

    assert_eq!(
        *lines.lock().unwrap(),
        vec!["Refreshing \u{FFFD} (dev)".to_string()]
    );
}

#[tokio::test]
#[serial]
async fn test_non_utf8_stderr_keeps_engine_message() {
    let fixture = Fixture::new();
    let mut driver = DeploymentDriver::new(
        fixture.engine(Some("fail-up-raw-bytes")),
        Box::new(FileSecretSource::new(fixture.path("secrets"))),
    )
    .with_output(|_| {});

    let err = driver.deploy(&StackConfig::default()).await.unwrap_err();

    assert_eq!(err.to_string(), "error: disk \u{FFFD} full");
}
