use assert_cmd::cargo_bin_cmd;
use assert_cmd::Command;
use geo_types::{coord, Coord};
use locality_index::feature::write_features;
use locality_index::{FeatureTags, RawFeature};
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn locality_cmd(work_dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("locality");
    cmd.current_dir(work_dir.path());
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("LOCALITY_CONFIG");
    cmd
}

fn square(id: u64, x: f64, y: f64, size: f64, ty: &str) -> RawFeature {
    let ring: Vec<Coord<f64>> = vec![
        coord! { x: x, y: y },
        coord! { x: x + size, y: y },
        coord! { x: x + size, y: y + size },
        coord! { x: x, y: y + size },
        coord! { x: x, y: y },
    ];
    RawFeature::area(id, vec![ring], FeatureTags::with_type(ty))
}

fn poi(id: u64, x: f64, y: f64) -> RawFeature {
    RawFeature::point(id, coord! { x: x, y: y }, FeatureTags::with_type("amenity-cafe"))
}

fn regions_file(dir: &Path) -> PathBuf {
    let path = dir.join("regions.dat");
    write_features(
        &path,
        &[
            square(1, 10.0, 10.0, 2.0, "place-state"),
            square(2, 20.0, 10.0, 2.0, "place-state"),
            poi(3, 11.0, 11.0),
        ],
    )
    .unwrap();
    path
}

fn geo_objects_file(dir: &Path) -> PathBuf {
    let path = dir.join("geo_objects.dat");
    write_features(
        &path,
        &[
            square(1, 37.6, 55.7, 0.001, "building"),
            poi(42, 37.61, 55.71),
            poi(43, 37.62, 55.72),
        ],
    )
    .unwrap();
    path
}

// ============================================================================
// Argument handling
// ============================================================================

#[test]
fn version_flag() {
    cargo_bin_cmd!("locality")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("locality"));
}

#[test]
fn help_lists_subcommands() {
    cargo_bin_cmd!("locality")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Locality index generator"))
        .stdout(predicate::str::contains("regions"))
        .stdout(predicate::str::contains("geo-objects"))
        .stdout(predicate::str::contains("data-version"));
}

#[test]
fn verbose_quiet_conflict() {
    cargo_bin_cmd!("locality")
        .args(["--verbose", "--quiet", "inspect", "x.mwm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn zero_threads_is_usage_error() {
    let tmp = TempDir::new().unwrap();
    let features = regions_file(tmp.path());
    locality_cmd(&tmp)
        .args(["--threads", "0", "regions"])
        .arg(&features)
        .args(["-o", "out.mwm"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--threads must be at least 1"));
}

// ============================================================================
// Generation
// ============================================================================

#[test]
fn regions_then_inspect() {
    let tmp = TempDir::new().unwrap();
    let features = regions_file(tmp.path());

    locality_cmd(&tmp)
        .args(["-j", "2", "regions"])
        .arg(&features)
        .args(["-o", "regions.mwm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("regions index written"))
        .stdout(predicate::str::contains("Objects:   2"));

    locality_cmd(&tmp)
        .args(["inspect", "regions.mwm", "--objects"])
        .assert()
        .success()
        .stdout(predicate::str::contains("locality.manifest"))
        .stdout(predicate::str::contains("Kind:          regions"))
        .stdout(predicate::str::contains("  1: "))
        .stdout(predicate::str::contains("  2: "));
}

#[test]
fn geo_objects_with_whitelist() {
    let tmp = TempDir::new().unwrap();
    let features = geo_objects_file(tmp.path());
    std::fs::write(tmp.path().join("nodes.txt"), "42 cafe\n").unwrap();

    locality_cmd(&tmp)
        .arg("geo-objects")
        .arg(&features)
        .args(["-o", "geo.mwm", "--nodes", "nodes.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("geo_objects index written"));

    let output = locality_cmd(&tmp)
        .args(["inspect", "geo.mwm", "--objects", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["manifest"]["object_count"], 2);
    assert!(report["objects"].get("42").is_some());
    assert!(report["objects"].get("43").is_none());
}

#[test]
fn malformed_whitelist_fails() {
    let tmp = TempDir::new().unwrap();
    let features = geo_objects_file(tmp.path());
    std::fs::write(tmp.path().join("nodes.txt"), "abc\n").unwrap();

    locality_cmd(&tmp)
        .arg("geo-objects")
        .arg(&features)
        .args(["-o", "geo.mwm", "--nodes", "nodes.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("line 1"));
    assert!(!tmp.path().join("geo.mwm").exists());
}

#[test]
fn config_file_sets_covering() {
    let tmp = TempDir::new().unwrap();
    let features = regions_file(tmp.path());
    std::fs::write(
        tmp.path().join("locality.toml"),
        "threads = 1\n[regions_covering]\nmax_level = 6\nmax_cells = 32\n",
    )
    .unwrap();

    locality_cmd(&tmp)
        .args(["--config", "locality.toml", "regions"])
        .arg(&features)
        .args(["-o", "regions.mwm"])
        .assert()
        .success();

    locality_cmd(&tmp)
        .args(["inspect", "regions.mwm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_level=6 max_cells=32"));
}

#[test]
fn malformed_config_fails() {
    let tmp = TempDir::new().unwrap();
    let features = regions_file(tmp.path());
    std::fs::write(tmp.path().join("locality.toml"), "threads = \"lots\"\n").unwrap();

    locality_cmd(&tmp)
        .args(["--config", "locality.toml", "regions"])
        .arg(&features)
        .args(["-o", "regions.mwm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("locality.toml"));
}

// ============================================================================
// Borders and data version
// ============================================================================

#[test]
fn borders_and_data_version_extend_container() {
    let tmp = TempDir::new().unwrap();
    let features = regions_file(tmp.path());

    locality_cmd(&tmp)
        .arg("regions")
        .arg(&features)
        .args(["-o", "country.mwm"])
        .assert()
        .success();

    locality_cmd(&tmp)
        .arg("borders")
        .arg(&features)
        .args(["-o", "country.mwm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 borders"));

    locality_cmd(&tmp)
        .args(["data-version", "country.mwm", r#"{"version": 1}"#])
        .assert()
        .success();

    locality_cmd(&tmp)
        .args(["inspect", "country.mwm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("borders"))
        .stdout(predicate::str::contains("version"))
        .stdout(predicate::str::contains("Objects:       2"));
}

#[test]
fn borders_require_existing_container() {
    let tmp = TempDir::new().unwrap();
    let features = regions_file(tmp.path());

    locality_cmd(&tmp)
        .arg("borders")
        .arg(&features)
        .args(["-o", "missing.mwm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("container not found"));
}

#[test]
fn empty_border_is_reported() {
    let tmp = TempDir::new().unwrap();
    let regions = regions_file(tmp.path());
    let broken = tmp.path().join("broken.dat");
    write_features(
        &broken,
        &[RawFeature::area(7, vec![vec![]], FeatureTags::default())],
    )
    .unwrap();

    locality_cmd(&tmp)
        .arg("regions")
        .arg(&regions)
        .args(["-o", "country.mwm"])
        .assert()
        .success();

    locality_cmd(&tmp)
        .arg("borders")
        .arg(&broken)
        .args(["-o", "country.mwm"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("empty border geometry for feature 7"));
}

#[test]
fn data_version_from_file() {
    let tmp = TempDir::new().unwrap();
    let features = regions_file(tmp.path());
    std::fs::write(tmp.path().join("version.json"), "{\"version\": 2}").unwrap();

    locality_cmd(&tmp)
        .arg("regions")
        .arg(&features)
        .args(["-o", "country.mwm"])
        .assert()
        .success();

    locality_cmd(&tmp)
        .args(["data-version", "country.mwm", "--file", "version.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("14 bytes"));
}

#[test]
fn inspect_missing_container_fails() {
    let tmp = TempDir::new().unwrap();
    locality_cmd(&tmp)
        .args(["inspect", "nothing.mwm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("container not found"));
}
