mod commands;
mod formatting;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser)]
#[command(name = "monoforge", version)]
#[command(about = "Build, version, and publish interdependent packages in a monorepo")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root directory.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(short, long, action)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show packages in dependency order with their detected states
    List {
        #[arg(long, action)]
        dev: bool,
        #[arg(long, action)]
        json: bool,
    },
    /// Build and install packages with their local dependencies
    Install {
        packages: Vec<String>,
        #[arg(long, action)]
        dev: bool,
        #[arg(long, action)]
        editable: bool,
    },
    /// Retarget dependency constraints after version bumps
    Update {
        #[arg(long, action)]
        cascade: bool,
        #[arg(long, action)]
        dry_run: bool,
    },
    /// Publish modified packages in dependency order
    Publish {
        packages: Vec<String>,
        #[arg(long, action)]
        dry_run: bool,
        #[arg(long, action)]
        no_propagate: bool,
    },
    /// Drop recorded snapshots so packages detect as modified again
    Clean {
        #[arg(long)]
        package: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    let verbose = cli.verbose > 0;
    let ok = match cli.command {
        Commands::List { dev, json } => commands::cmd_list(&cli.root, dev, json)?,
        Commands::Install {
            packages,
            dev,
            editable,
        } => commands::cmd_install(&cli.root, packages, dev, editable, verbose)?,
        Commands::Update { cascade, dry_run } => {
            commands::cmd_update(&cli.root, cascade, dry_run)?
        }
        Commands::Publish {
            packages,
            dry_run,
            no_propagate,
        } => commands::cmd_publish(&cli.root, packages, dry_run, no_propagate, verbose)?,
        Commands::Clean { package } => commands::cmd_clean(&cli.root, package)?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
