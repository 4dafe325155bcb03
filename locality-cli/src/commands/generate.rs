use crate::error::{CliError, CliResult};
use colored::Colorize;
use locality_index::{LocalityGenerator, PipelineSummary};
use std::fs;
use std::path::Path;

fn require_file(path: &Path, what: &str) -> CliResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::Input(format!("{what} not found: {}", path.display())))
    }
}

fn print_summary(out: &Path, summary: &PipelineSummary, quiet: bool) {
    if quiet {
        return;
    }
    println!(
        "{} {} index written to {}",
        "Built".green().bold(),
        summary.index.kind.as_str(),
        out.display()
    );
    println!("  Workers:   {}", summary.workers);
    println!(
        "  Features:  {} read, {} rejected, {} dropped",
        summary.stats.features, summary.stats.rejected, summary.stats.dropped
    );
    println!("  Objects:   {}", summary.index.objects);
    println!("  Entries:   {}", summary.index.entries);
    println!("  Leaflets:  {}", summary.index.leaflets);
}

pub fn run_regions(
    generator: &LocalityGenerator,
    features: &Path,
    out: &Path,
    quiet: bool,
) -> CliResult<()> {
    require_file(features, "feature stream")?;
    let summary = generator.regions_index(out, features)?;
    print_summary(out, &summary, quiet);
    Ok(())
}

pub fn run_geo_objects(
    generator: &LocalityGenerator,
    features: &Path,
    out: &Path,
    nodes: Option<&Path>,
    streets: Option<&Path>,
    quiet: bool,
) -> CliResult<()> {
    require_file(features, "feature stream")?;
    if let Some(nodes) = nodes {
        require_file(nodes, "nodes whitelist")?;
    }
    if let Some(streets) = streets {
        require_file(streets, "streets stream")?;
    }
    let summary = generator.geo_objects_index(out, features, nodes, streets)?;
    print_summary(out, &summary, quiet);
    Ok(())
}

pub fn run_borders(
    generator: &LocalityGenerator,
    features: &Path,
    out: &Path,
    quiet: bool,
) -> CliResult<()> {
    require_file(features, "feature stream")?;
    require_file(out, "container")?;
    let records = generator.borders(out, features)?;
    if !quiet {
        println!(
            "{} {records} borders to {}",
            "Wrote".green().bold(),
            out.display()
        );
    }
    Ok(())
}

pub fn run_data_version(
    generator: &LocalityGenerator,
    out: &Path,
    text: Option<&str>,
    file: Option<&Path>,
    quiet: bool,
) -> CliResult<()> {
    let version_text = match (text, file) {
        (Some(text), None) => text.to_string(),
        (None, Some(file)) => fs::read_to_string(file)
            .map_err(|e| CliError::Input(format!("cannot read {}: {e}", file.display())))?,
        _ => {
            return Err(CliError::Usage(
                "provide the version text or --file, not both".into(),
            ))
        }
    };
    require_file(out, "container")?;
    generator.data_version(out, &version_text)?;
    if !quiet {
        println!(
            "{} data version ({} bytes) to {}",
            "Wrote".green().bold(),
            version_text.len(),
            out.display()
        );
    }
    Ok(())
}
