//! Binary entry point for the unikops CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use unikops::commands::{self, CommandEnv, CreateRequest, TargetOptions};
use unikops::config::{ConfigError, OpsSettings};
use unikops::error::OpsError;

mod cli;

use cli::{Cli, CreateCommand, ImageCommand, TargetArgs};

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ops(#[from] OpsError),
    #[error("interrupted")]
    Interrupted,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = tokio::select! {
        outcome = dispatch(cli) => outcome,
        _ = tokio::signal::ctrl_c() => Err(CliError::Interrupted),
    };

    let exit_code = match result {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };
    process::exit(exit_code);
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let settings = OpsSettings::load_without_cli_args()?;
    let env = CommandEnv::from_settings(&settings)?;
    let mut stdout = io::stdout();
    match cli {
        Cli::Image(command) => run_image(&env, command, &mut stdout).await,
    }
}

async fn run_image(
    env: &CommandEnv,
    command: ImageCommand,
    out: &mut (dyn Write + Send),
) -> Result<(), CliError> {
    match command {
        ImageCommand::Create(args) => commands::create(env, &create_request(args), out).await?,
        ImageCommand::List(args) => {
            commands::list(env, &target_options(args.target), out).await?;
        }
        ImageCommand::Delete(args) => {
            commands::delete(env, &target_options(args.target), &args.name).await?;
        }
        ImageCommand::Resize(args) => {
            commands::resize(env, &target_options(args.target), &args.name, &args.size).await?;
        }
        ImageCommand::Sync(args) => {
            commands::sync(env, &target_options(args.target), &args.name, &args.source).await?;
        }
    }
    Ok(())
}

fn target_options(args: TargetArgs) -> TargetOptions {
    TargetOptions {
        config_path: args.config.map(Utf8PathBuf::from),
        platform: args.target_cloud,
        zone: args.zone,
    }
}

fn create_request(args: CreateCommand) -> CreateRequest {
    CreateRequest {
        target: target_options(args.target),
        package: args.package,
        args: args.args,
        mounts: args.mounts,
        nightly: args.nightly,
        image_name: args.image_name,
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
