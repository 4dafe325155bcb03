mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use error::exit_with_error;
use locality_index::LocalityGenerator;

fn init_tracing(cli: &Cli) {
    // --quiet silences everything; --verbose honours RUST_LOG and falls back
    // to "info". Without either flag only warnings and errors reach stderr.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };

    let ansi = !(cli.no_color || std::env::var_os("NO_COLOR").is_some());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color || std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    init_tracing(&cli);

    if let Err(e) = run(cli) {
        exit_with_error(e);
    }
}

fn run(cli: Cli) -> error::CliResult<()> {
    let quiet = cli.quiet;
    let config_path = cli.config.as_deref();
    let generator = || -> error::CliResult<LocalityGenerator> {
        Ok(LocalityGenerator::new(config::load_generator_config(
            config_path,
            cli.threads,
        )?))
    };

    match &cli.command {
        Commands::Regions { features, out } => {
            commands::generate::run_regions(&generator()?, features, out, quiet)
        }

        Commands::GeoObjects {
            features,
            out,
            nodes,
            streets,
        } => commands::generate::run_geo_objects(
            &generator()?,
            features,
            out,
            nodes.as_deref(),
            streets.as_deref(),
            quiet,
        ),

        Commands::Borders { features, out } => {
            commands::generate::run_borders(&generator()?, features, out, quiet)
        }

        Commands::DataVersion { out, text, file } => commands::generate::run_data_version(
            &generator()?,
            out,
            text.as_deref(),
            file.as_deref(),
            quiet,
        ),

        Commands::Inspect {
            path,
            objects,
            json,
        } => commands::inspect::run(path, *objects, *json),
    }
}
