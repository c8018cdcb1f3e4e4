mod cli;
mod commands;
mod config;
mod observability;
mod output;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands, ConfigCommands};
use commands::Session;
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();
    let config_path = config::config_path(cli.config.as_deref())?;
    let cfg = config::load(&config_path)?;
    observability::init_tracing(&cfg.log_level);

    match &cli.command {
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show => {
                println!("{}: {}", "Config".cyan(), config_path.display());
                println!("{}", toml::to_string_pretty(&cfg)?);
            }
            ConfigCommands::Path => {
                println!("{}", config_path.display());
            }
        },
        Commands::Introspect(args) => {
            let endpoint = config::resolve_endpoint(&cfg, args.endpoint.as_deref())?;
            let session = Session::new(cfg)?;
            commands::schema::introspect(&session, &endpoint, format).await?;
        }
        Commands::Fields(args) => {
            let endpoint = config::resolve_endpoint(&cfg, args.endpoint.as_deref())?;
            let session = Session::new(cfg)?;
            commands::schema::fields(
                &session,
                &endpoint,
                args.type_name.as_deref(),
                args.mutation,
                format,
            )
            .await?;
        }
        Commands::Compile(args) => {
            let session = Session::new(cfg)?;
            commands::blocks::compile_tree(&session, args, format).await?;
        }
        Commands::Run(args) => {
            let session = Session::new(cfg)?;
            commands::blocks::run_tree(&session, args, format).await?;
        }
    }

    Ok(())
}
