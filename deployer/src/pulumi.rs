//! [`StackEngine`] backed by the `pulumi` CLI.
//!
//! The rendered program is written as `Pulumi.yaml` into a work directory
//! and every command runs with `--cwd` pointing there. Progress from
//! `refresh` and `up` is streamed line by line; the change summary is read
//! back from `pulumi stack history`.

use crate::engine::{
    ConfigValue, EngineError, EngineResult, OutputSink, StackEngine, UpdateSummary,
};
use async_trait::async_trait;
use stack::{PluginSpec, Program, PROGRAM_FILE};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::debug;

enum WorkDir {
    Temp(TempDir),
    Fixed(PathBuf),
}

impl WorkDir {
    fn path(&self) -> &Path {
        match self {
            WorkDir::Temp(dir) => dir.path(),
            WorkDir::Fixed(path) => path,
        }
    }
}

pub struct PulumiCli {
    binary: PathBuf,
    work_dir: WorkDir,
    backend_url: Option<String>,
    env_vars: Vec<(String, String)>,
    stack: Option<String>,
}

impl PulumiCli {
    /// Uses `pulumi` from `PATH` and a fresh temporary work directory.
    pub fn new() -> EngineResult<Self> {
        Ok(Self {
            binary: PathBuf::from("pulumi"),
            work_dir: WorkDir::Temp(
                tempfile::Builder::new()
                    .prefix("oracle-stack-")
                    .tempdir()?,
            ),
            backend_url: None,
            env_vars: Vec::new(),
            stack: None,
        })
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = WorkDir::Fixed(work_dir.into());
        self
    }

    pub fn with_backend_url(mut self, backend_url: impl Into<String>) -> Self {
        self.backend_url = Some(backend_url.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn selected_stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    fn stack_name(&self) -> EngineResult<&str> {
        self.stack.as_deref().ok_or(EngineError::NoStackSelected)
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--non-interactive")
            .arg("--cwd")
            .arg(self.work_dir())
            .args(args)
            .env("PULUMI_SKIP_UPDATE_CHECK", "true")
            .kill_on_drop(true);

        if let Some(url) = &self.backend_url {
            cmd.env("PULUMI_BACKEND_URL", url);
        }
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        cmd
    }

    fn display(&self, args: &[&str]) -> String {
        format!("{} {}", self.binary.display(), args.join(" "))
    }

    fn failure(&self, args: &[&str], status: ExitStatus, stderr: &str) -> EngineError {
        let stderr = stderr.trim();
        let message = if stderr.is_empty() {
            format!("{} exited with {}", self.display(args), status)
        } else {
            stderr.to_string()
        };
        EngineError::CommandFailed {
            command: self.display(args),
            message,
        }
    }

    /// Runs to completion and returns stdout. `stdin` is written to the
    /// child and closed, so values passed this way never appear in argv.
    async fn run(&self, args: &[&str], stdin: Option<&str>) -> EngineResult<String> {
        debug!("Running {}", self.display(args));

        let mut child = self
            .command(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::Spawn {
                command: self.display(args),
                reason: e.to_string(),
            })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await?;
            pipe.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(self.failure(
                args,
                output.status,
                &String::from_utf8_lossy(&output.stderr),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Runs to completion, handing each stdout line to `on_output` as it
    /// arrives. Bytes that are not UTF-8 are replaced, never rejected.
    async fn stream(&self, args: &[&str], on_output: OutputSink<'_>) -> EngineResult<()> {
        debug!("Streaming {}", self.display(args));

        let mut child = self
            .command(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::Spawn {
                command: self.display(args),
                reason: e.to_string(),
            })?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                if let Err(e) = stderr.read_to_end(&mut buf).await {
                    debug!("Failed to read engine stderr: {}", e);
                }
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            while reader.read_until(b'\n', &mut buf).await? > 0 {
                on_output(&decode_line(&buf));
                buf.clear();
            }
        }

        let status = child.wait().await?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(self.failure(args, status, &stderr));
        }

        Ok(())
    }

    async fn latest_summary(&self) -> EngineResult<UpdateSummary> {
        let stack = self.stack_name()?;
        let args = ["stack", "history", "--stack", stack, "--json", "--page-size", "1"];
        let stdout = self.run(&args, None).await?;

        let mut entries: Vec<UpdateSummary> =
            serde_json::from_str(&stdout).map_err(|e| EngineError::InvalidOutput {
                command: self.display(&args),
                reason: e.to_string(),
            })?;

        if entries.is_empty() {
            return Err(EngineError::InvalidOutput {
                command: self.display(&args),
                reason: "stack history is empty".to_string(),
            });
        }

        Ok(entries.swap_remove(0))
    }
}

/// A raw stdout line without its terminator, decoded lossily.
fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

#[async_trait]
impl StackEngine for PulumiCli {
    async fn select_stack(&mut self, program: &Program, stack_name: &str) -> EngineResult<()> {
        tokio::fs::create_dir_all(self.work_dir()).await?;
        tokio::fs::write(self.work_dir().join(PROGRAM_FILE), program.to_yaml()?).await?;

        self.run(&["stack", "select", "--create", stack_name], None).await?;
        self.stack = Some(stack_name.to_string());
        Ok(())
    }

    async fn install_plugin(&self, plugin: &PluginSpec) -> EngineResult<()> {
        let args = [
            "plugin",
            "install",
            "resource",
            plugin.name.as_str(),
            plugin.version.as_str(),
        ];
        self.run(&args, None).await?;
        Ok(())
    }

    async fn set_config(&self, key: &str, value: &ConfigValue) -> EngineResult<()> {
        let stack = self.stack_name()?;
        match value {
            ConfigValue::Plain(plain) => {
                let args = [
                    "config",
                    "set",
                    "--stack",
                    stack,
                    "--plaintext",
                    key,
                    "--",
                    plain.as_str(),
                ];
                self.run(&args, None).await?;
            }
            ConfigValue::Secret(secret) => {
                self.run(
                    &["config", "set", "--stack", stack, "--secret", key],
                    Some(secret.expose()),
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn refresh(&self, on_output: OutputSink<'_>) -> EngineResult<()> {
        let stack = self.stack_name()?;
        self.stream(
            &["refresh", "--stack", stack, "--yes", "--skip-preview"],
            on_output,
        )
        .await
    }

    async fn up(&self, on_output: OutputSink<'_>) -> EngineResult<UpdateSummary> {
        let stack = self.stack_name()?;
        self.stream(&["up", "--stack", stack, "--yes", "--skip-preview"], on_output)
            .await?;
        self.latest_summary().await
    }

    fn engine_name(&self) -> &'static str {
        "pulumi"
    }
}
