use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "locality", about = "Locality index generator", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output (also respects NO_COLOR env var)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to a TOML generator config file
    #[arg(long, global = true, env = "LOCALITY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of covering workers (defaults to available parallelism)
    #[arg(long, short = 'j', global = true)]
    pub threads: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the regions index from administrative area features
    Regions {
        /// Raw feature stream
        features: PathBuf,

        /// Output container file
        #[arg(long, short = 'o')]
        out: PathBuf,
    },

    /// Build the geo-objects index (buildings, POIs and optional streets)
    GeoObjects {
        /// Raw feature stream of geo objects
        features: PathBuf,

        /// Output container file
        #[arg(long, short = 'o')]
        out: PathBuf,

        /// Whitelist of POI node ids, one per line
        #[arg(long)]
        nodes: Option<PathBuf>,

        /// Raw feature stream of streets to merge into the index
        #[arg(long)]
        streets: Option<PathBuf>,
    },

    /// Write the borders section of an existing container
    Borders {
        /// Raw feature stream holding the area features
        features: PathBuf,

        /// Existing container file
        #[arg(long, short = 'o')]
        out: PathBuf,
    },

    /// Write the data version section of an existing container
    DataVersion {
        /// Existing container file
        out: PathBuf,

        /// Version text (JSON); use --file to read it from disk
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,

        /// Read the version text from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Show the sections and index metadata of a container
    Inspect {
        /// Container file
        path: PathBuf,

        /// Also list the cells of every object
        #[arg(long)]
        objects: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}
