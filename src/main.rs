//! zope2instance - Main entry point
//!
//! Loads the option map, then runs one provisioning command against it.

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use zope2instance::cli::{Cli, Commands};
use zope2instance::options::{Options, RecipeOptions};
use zope2instance::package_includes::parse_directives;
use zope2instance::zope_conf::{ensure_data_directories, render_zope_conf};
use zope2instance::{IncludeMode, Instance, UpdateOutcome};

/// Initialize the logger; RUST_LOG overrides the default level
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// Options file first, then `--set` overrides in order
fn load_options(cli: &Cli) -> Result<Options> {
    let mut options = match &cli.options {
        Some(path) => Options::load_from_file(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => Options::new(),
    };
    for assignment in &cli.overrides {
        options
            .apply_override(assignment)
            .context("Invalid --set override")?;
    }
    debug!("Loaded {} option(s)", options.iter().count());
    Ok(options)
}

fn run(cli: &Cli) -> Result<()> {
    let options = load_options(cli)?;

    match &cli.command {
        Commands::Install => {
            let instance = Instance::from_options(&options)?;
            let location = instance.install().context("Install failed")?;
            println!("✓ Installed {}", location.display());
        }
        Commands::Update => {
            let instance = Instance::from_options(&options)?;
            match instance.update().context("Update failed")? {
                UpdateOutcome::Rebuilt(location) => {
                    println!("✓ Rebuilt {}", location.display())
                }
                UpdateOutcome::Unchanged(location) => {
                    println!("✓ {} is up to date", location.display())
                }
            }
        }
        Commands::RenderConfig { dry_run } => {
            let recipe = RecipeOptions::from_options(&options)?;
            if *dry_run {
                info!("Dry run: not creating log or storage directories");
            } else {
                ensure_data_directories(&recipe)?;
            }
            print!("{}", render_zope_conf(&recipe)?);
        }
        Commands::Includes => {
            let recipe = RecipeOptions::from_options(&options)?;
            let (mode, directives) = parse_directives(&recipe.zcml)?;
            if mode == IncludeMode::Additive {
                println!("# existing stubs are kept");
            }
            for (offset, directive) in directives.iter().enumerate() {
                println!("{}\t{}", directive.stub_name(offset + 1), directive);
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    debug!("CLI arguments parsed");

    if let Err(e) = run(&cli) {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}
