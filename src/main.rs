mod backup;
mod cli;
mod error;
mod provider;
mod state;

use clap::Parser;
use cli::{Cli, Commands};
use state::Config;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init();
}

/// Config file (or defaults) overlaid with command-line flags.
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::resolve(cli.config.as_deref())?;

    if let Some(dir) = &cli.backup_dir {
        config.backup_dir = dir.clone();
    }
    if let Some(Commands::Backup { only }) = &cli.command {
        if !only.is_empty() {
            config.categories = Some(only.clone());
        }
    }

    Ok(config)
}

async fn dispatch(cli: &Cli, config: &Config) -> anyhow::Result<bool> {
    match &cli.command {
        None | Some(Commands::Backup { .. }) => return cli::commands::backup::run(config).await,
        Some(Commands::Auth) => cli::commands::auth::run(config).await?,
        Some(Commands::Logout) => cli::commands::auth::logout(config).await?,
        Some(Commands::Whoami) => cli::commands::auth::whoami(config).await?,
        Some(Commands::Log) => cli::commands::misc::log(config).await?,
        Some(Commands::Categories) => cli::commands::misc::categories(config).await?,
    }
    Ok(true)
}

#[tokio::main]
async fn main() {
    // Load .env file if present (ignores if missing)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match load_config(&cli) {
        Ok(config) => dispatch(&cli, &config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    let code = exit_code(&result);
    if code != 0 {
        std::process::exit(code);
    }
}

/// 0 when every selected category was written or unchanged, 1 otherwise.
fn exit_code(result: &anyhow::Result<bool>) -> i32 {
    match result {
        Ok(true) => 0,
        Ok(false) | Err(_) => 1,
    }
}
