use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "blockgql")]
#[command(about = "blockgql CLI: inspect GraphQL schemas and compile persisted query blocks")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ~/.blockgql/config.toml)
    #[arg(short, long, global = true, env = "BLOCKGQL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch an endpoint's schema and list its types
    Introspect(IntrospectArgs),
    /// List the fields a block of the given type can hold
    Fields(FieldsArgs),
    /// Compile a persisted block tree
    Compile(CompileArgs),
    /// Compile a persisted block tree and execute it
    Run(RunArgs),
    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct IntrospectArgs {
    /// Endpoint name from the config, or a URL (defaults to default_endpoint)
    pub endpoint: Option<String>,
}

#[derive(clap::Args)]
pub struct FieldsArgs {
    /// Endpoint name from the config, or a URL
    pub endpoint: Option<String>,
    /// Type to list (defaults to the query root)
    #[arg(short = 't', long = "type")]
    pub type_name: Option<String>,
    /// List the mutation root instead of the query root
    #[arg(long, conflicts_with = "type_name")]
    pub mutation: bool,
}

#[derive(clap::Args)]
pub struct CompileArgs {
    /// Path to the persisted block tree (XML)
    pub file: PathBuf,
    /// Fetch the tree's schema first and report stale blocks
    #[arg(long)]
    pub check: bool,
    /// Print the host plan instead of the query text
    #[arg(long)]
    pub plan: bool,
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Path to the persisted block tree (XML)
    pub file: PathBuf,
    /// Send to this endpoint instead of the one the tree was built for
    #[arg(short, long)]
    pub endpoint: Option<String>,
    /// Execute as a mutation
    #[arg(long)]
    pub mutation: bool,
    /// Operation name
    #[arg(short, long)]
    pub name: Option<String>,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show,
    /// Print the config file path in use
    Path,
}
