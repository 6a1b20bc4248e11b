use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ctfd-cli", about = "CTFd configuration tool")]
pub struct Cli {
    /// Instance base directory (defaults to the current directory)
    #[arg(short, long, global = true)]
    pub base_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved configuration
    Show(ShowArgs),

    /// Diagnose the configuration without starting anything
    Check,

    /// Persist the secret key and create the runtime directories
    Init,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Resolve the testing profile instead of the standard one
    #[arg(long)]
    pub testing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Toml,
}
