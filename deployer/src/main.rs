use clap::{Parser, Subcommand};
use deployer::{
    ci, DeploymentDriver, DriverResult, EnvSecretSource, FileSecretSource, PulumiCli,
    SecretSource,
};
use stack::{build_stack, Program, StackConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "oracle-stack")]
#[command(about = "Provision the Azure Oracle container stack through Pulumi")]
struct Cli {
    /// TOML file overriding the built-in stack configuration
    #[arg(short, long, env = "ORACLE_STACK_CONFIG")]
    config: Option<PathBuf>,
    /// Stack to create or select
    #[arg(long)]
    stack: Option<String>,
    /// Directory for the generated Pulumi project (temporary if omitted)
    #[arg(long)]
    work_dir: Option<PathBuf>,
    /// Pulumi CLI executable
    #[arg(long, default_value = "pulumi")]
    pulumi_bin: PathBuf,
    /// State backend passed to the engine
    #[arg(long, env = "PULUMI_BACKEND_URL")]
    backend_url: Option<String>,
    /// Read secrets from files in this directory instead of the environment
    #[arg(long, env = "ORACLE_STACK_SECRETS_DIR")]
    secrets_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh and apply the stack (default)
    Up,
    /// Print the generated Pulumi program without deploying
    Render,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Deployment failed: {}", e);
            ci::set_failed(&e.to_string())
        }
    }
}

fn load_config(cli: &Cli) -> DriverResult<StackConfig> {
    let mut config = match &cli.config {
        Some(path) => StackConfig::load(path)?,
        None => StackConfig::default(),
    };
    if let Some(stack) = &cli.stack {
        config = config.with_stack_name(stack);
    }
    Ok(config)
}

fn render(config: &StackConfig) -> DriverResult<String> {
    let program = Program::from_definition(&build_stack(config)?);
    Ok(program.to_yaml()?)
}

async fn run(cli: Cli) -> DriverResult<()> {
    let config = load_config(&cli)?;

    match cli.command.as_ref().unwrap_or(&Commands::Up) {
        Commands::Render => {
            print!("{}", render(&config)?);
            Ok(())
        }
        Commands::Up => deploy(&cli, &config).await,
    }
}

async fn deploy(cli: &Cli, config: &StackConfig) -> DriverResult<()> {
    let mut engine = PulumiCli::new()?.with_binary(&cli.pulumi_bin);
    if let Some(dir) = &cli.work_dir {
        engine = engine.with_work_dir(dir);
    }
    if let Some(url) = &cli.backend_url {
        engine = engine.with_backend_url(url);
    }

    let secrets: Box<dyn SecretSource> = match &cli.secrets_dir {
        Some(dir) => Box::new(FileSecretSource::new(dir)),
        None => Box::new(EnvSecretSource::new()),
    };
    info!("Reading secrets from {}", secrets.source_name());

    let mut driver = DeploymentDriver::new(engine, secrets);
    let summary = match driver.deploy(config).await {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(step) = driver.failed_step() {
                error!("Stopped at step: {}", step);
            }
            return Err(e);
        }
    };

    match summary.to_pretty_json() {
        Ok(json) => println!("update summary: \n{}", json),
        Err(e) => error!("Failed to format update summary: {}", e),
    }

    Ok(())
}
