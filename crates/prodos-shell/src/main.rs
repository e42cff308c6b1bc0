//! ProductionOS admin client shell - login, session inspection, and
//! activity-driven session keep-alive from the command line.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use prodos_core::{init_logging, Config, Paths};

/// ProductionOS admin client command-line interface.
#[derive(Parser)]
#[command(name = "prodos")]
#[command(about = "ProductionOS admin client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Base directory for runtime files (config, profile). Defaults to ~/.prodos
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and persist a session
    Login {
        /// Account email (ignored by shared-secret deployments)
        #[arg(short, long, default_value = "")]
        identifier: String,

        /// Password, or the deployment's shared secret
        #[arg(short, long, env = "PRODOS_PASSWORD")]
        secret: String,
    },
    /// Show the current authentication status
    Status,
    /// End the current session
    Logout,
    /// Keep the session alive while activity arrives on stdin
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    match cli.command {
        Commands::Login { identifier, secret } => {
            app::login(&config, &paths, &identifier, &secret).await
        }
        Commands::Status => app::status(&config, &paths).await,
        Commands::Logout => app::logout(&config, &paths).await,
        Commands::Watch => app::watch(&config, &paths).await,
    }
}
