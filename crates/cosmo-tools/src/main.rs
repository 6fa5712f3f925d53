//! Cosmo - Content Tools

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cosmo_tools::commands;

#[derive(Parser)]
#[command(name = "cosmo-tools")]
#[command(about = "Content tools for the Cosmo tech tree")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a content directory and report every problem
    Validate {
        /// Path to content directory
        #[arg(default_value = "content")]
        path: PathBuf,
        /// Content config file (defaults to <path>/config.*)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print every tech, prerequisites first
    Order {
        #[arg(default_value = "content")]
        path: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List techs researchable once the known techs are researched
    Next {
        #[arg(default_value = "content")]
        path: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Already researched techs
        #[arg(long, num_args = 1..)]
        known: Vec<String>,
        /// Only techs on the way to this tech
        #[arg(long)]
        towards: Option<String>,
    },
    /// Print the full definition of one tech
    Show {
        name: String,
        #[arg(long, default_value = "content")]
        path: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { path, config } => {
            tracing::info!("Validating content in: {}", path.display());
            commands::open(&path, config.as_deref()).map(|report| {
                print_lines(&commands::validate(&report));
                report.is_clean()
            })
        }
        Commands::Order { path, config } => commands::open(&path, config.as_deref())
            .and_then(|report| commands::order(&report.tree))
            .map(|lines| {
                print_lines(&lines);
                true
            }),
        Commands::Next {
            path,
            config,
            known,
            towards,
        } => commands::open(&path, config.as_deref())
            .and_then(|report| commands::next(&report.tree, &known, towards.as_deref()))
            .map(|lines| {
                print_lines(&lines);
                true
            }),
        Commands::Show { name, path, config } => commands::open(&path, config.as_deref())
            .and_then(|report| commands::show(&report.tree, &name))
            .map(|dump| {
                println!("{dump}");
                true
            }),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
