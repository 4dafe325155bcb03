use crate::error::{CliError, CliResult};
use colored::Colorize;
use locality_index::index_builder::MANIFEST_SECTION;
use locality_index::{CellId, Container, IndexManifest, LocalityIndexReader};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Serialize)]
struct SectionInfo {
    tag: String,
    bytes: usize,
}

#[derive(Serialize)]
struct InspectReport {
    path: String,
    sections: Vec<SectionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest: Option<IndexManifest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    objects: Option<BTreeMap<u64, Vec<String>>>,
}

fn cell_label(raw: u64) -> String {
    match CellId::from_raw(raw) {
        Some(cell) => cell.to_string(),
        None => format!("invalid({raw:#x})"),
    }
}

fn build_report(path: &Path, with_objects: bool) -> CliResult<InspectReport> {
    if !path.is_file() {
        return Err(CliError::Input(format!(
            "container not found: {}",
            path.display()
        )));
    }
    let container = Container::open_existing(path)?;
    let sections = container
        .tags()
        .map(|tag| -> CliResult<SectionInfo> {
            Ok(SectionInfo {
                tag: tag.to_string(),
                bytes: container.section(tag)?.len(),
            })
        })
        .collect::<CliResult<Vec<_>>>()?;

    let reader = if container.has_section(MANIFEST_SECTION) {
        Some(LocalityIndexReader::open(path)?)
    } else {
        None
    };
    let objects = match (&reader, with_objects) {
        (Some(reader), true) => Some(
            reader
                .associations()
                .into_iter()
                .map(|(id, cells)| (id, cells.into_iter().map(cell_label).collect()))
                .collect(),
        ),
        _ => None,
    };

    Ok(InspectReport {
        path: path.display().to_string(),
        sections,
        manifest: reader.map(|r| r.manifest().clone()),
        objects,
    })
}

fn print_report(report: &InspectReport) {
    println!("{} {}", "Container:".bold(), report.path);
    println!("Sections:");
    for section in &report.sections {
        println!("  {:<24} {:>10} bytes", section.tag, section.bytes);
    }
    match &report.manifest {
        Some(manifest) => {
            println!("Index:");
            println!("  Kind:          {}", manifest.kind.as_str());
            println!("  Format:        v{}", manifest.format_version);
            println!(
                "  Covering:      max_level={} max_cells={}",
                manifest.covering.max_level, manifest.covering.max_cells
            );
            println!("  Objects:       {}", manifest.object_count);
            println!("  Entries:       {}", manifest.entry_count);
            println!("  Leaflets:      {}", manifest.leaflets.len());
        }
        None => println!("Index:           {}", "(none)".dimmed()),
    }
    if let Some(objects) = &report.objects {
        println!("Objects:");
        for (id, cells) in objects {
            println!("  {id}: {}", cells.join(" "));
        }
    }
}

pub fn run(path: &Path, objects: bool, json: bool) -> CliResult<()> {
    let report = build_report(path, objects)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}
