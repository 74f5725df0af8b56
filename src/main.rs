//! mackup-config - resolve and display the Mackup configuration.
//!
//! # Execution Flow
//!
//! 1. Parse command line arguments
//! 2. Initialize logging (stderr, plus a rotating file with `--log-dir`)
//! 3. Capture `HOME` and the working directory
//! 4. Resolve `.mackup.cfg` (or the file given with `--config`)
//! 5. Print the resolved configuration as text or JSON
//!
//! An old-format config file stops the program with a migration message and
//! exit status 1. Invalid values are reported as errors, also with status 1.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, ValueEnum};
use mackup::{APP_NAME, ConfigResolver, HostEnvironment, ResolvedConfig, VERSION};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "mackup-config")]
#[command(author, version, about = "Show the storage settings Mackup would use")]
struct Cli {
    /// Config file to use instead of ~/.mackup.cfg
    ///
    /// Looked up as given (with ~ expanded), then under $HOME, then under the
    /// current directory.
    #[arg(short, long, value_name = "PATH")]
    config: Option<Utf8PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also write logs to a daily rotating file in this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<Utf8PathBuf>,
}

#[derive(Serialize)]
struct Report<'a> {
    config_file: Option<&'a Utf8Path>,
    engine: mackup::Engine,
    path: &'a Utf8Path,
    directory: &'a str,
    full_path: Utf8PathBuf,
    apps_to_ignore: &'a BTreeSet<String>,
    apps_to_sync: &'a BTreeSet<String>,
}

impl<'a> Report<'a> {
    fn new(config: &'a ResolvedConfig) -> Self {
        Self {
            config_file: config.source().path(),
            engine: config.engine(),
            path: config.path(),
            directory: config.directory(),
            full_path: config.full_path(),
            apps_to_ignore: config.apps_to_ignore(),
            apps_to_sync: config.apps_to_sync(),
        }
    }
}

fn join_apps(apps: &BTreeSet<String>) -> String {
    if apps.is_empty() {
        "(none)".to_string()
    } else {
        apps.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}

fn print_text(config: &ResolvedConfig) {
    println!("Config file:    {}", config.source());
    println!("Engine:         {}", config.engine());
    println!("Path:           {}", config.path());
    println!("Directory:      {}", config.directory());
    println!("Full path:      {}", config.full_path());
    println!("Apps to ignore: {}", join_apps(config.apps_to_ignore()));
    println!("Apps to sync:   {}", join_apps(config.apps_to_sync()));
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Held until exit so buffered file logs get flushed
    let guard = match &cli.log_dir {
        Some(dir) => Some(mackup::logging::setup_logging_with_file(
            dir,
            APP_NAME,
            cli.verbose,
        )?),
        None => {
            mackup::logging::setup_logging(cli.verbose)?;
            None
        }
    };

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let env = HostEnvironment::from_process().context("Cannot read the host environment")?;
    let resolver = ConfigResolver::new(env);

    let config = match resolver.resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) if err.is_fatal() => {
            eprintln!("{}", err);
            drop(guard);
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    match cli.format {
        OutputFormat::Text => print_text(&config),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&Report::new(&config))
                .context("Failed to serialize configuration to JSON")?;
            println!("{}", json);
        }
    }

    drop(guard);
    Ok(())
}
