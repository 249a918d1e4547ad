use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// zope2instance - provision a Zope 2 instance tree
#[derive(Parser)]
#[command(name = "zope2instance")]
#[command(about = "Create, update and configure a Zope 2 instance")]
#[command(version)]
pub struct Cli {
    /// JSON file holding the option map (a flat object of strings)
    #[arg(short, long, global = true)]
    pub options: Option<PathBuf>,

    /// Override a single option, e.g. --set zeo-client=on
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE", global = true)]
    pub overrides: Vec<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Wipe and provision the instance from scratch
    Install,
    /// Rebuild the instance only if the working set changed
    Update,
    /// Print the rendered zope.conf without touching the instance
    RenderConfig {
        /// Do not create log and storage directories
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate the zcml option and list the stubs it would produce
    Includes,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
