//! CLI integration tests for Keelson.
//!
//! Network-free: these exercise catalog listing, argument handling, and
//! the fail-fast paths that trip before any download starts.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the keelson binary command.
fn keelson() -> Command {
    Command::cargo_bin("keelson").unwrap()
}

fn write_recipe(dir: &Path, name: &str, deps: &[&str]) {
    use sha2::{Digest, Sha256};

    let deps = deps
        .iter()
        .map(|d| format!("\"{d}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let toml = format!(
        r#"name = "{name}"
version = "1.0"
source = "https://dist.example/{name}-1.0.tar.gz"
sha256 = "{sum}"
dependencies = [{deps}]

[[build]]

[build.run]
program = "make"
args = ["install"]
"#,
        sum = hex::encode(Sha256::digest(name.as_bytes())),
    );
    fs::write(dir.join(format!("{name}.toml")), toml).unwrap();
}

// ============================================================================
// keelson ls-available
// ============================================================================

#[test]
fn test_ls_available_lists_catalog_sorted() {
    let tmp = TempDir::new().unwrap();
    let recipes = tmp.path().join("recipes");
    fs::create_dir(&recipes).unwrap();
    write_recipe(&recipes, "perl", &[]);
    write_recipe(&recipes, "gm4", &["perl"]);

    keelson()
        .args(["ls-available"])
        .arg("--recipes")
        .arg(&recipes)
        .arg("--prefix")
        .arg(tmp.path().join("prefix"))
        .assert()
        .success()
        .stdout(predicate::str::diff("gm4\nperl\n"));
}

#[test]
fn test_ls_available_detailed_shows_provenance() {
    let tmp = TempDir::new().unwrap();
    let recipes = tmp.path().join("recipes");
    fs::create_dir(&recipes).unwrap();
    write_recipe(&recipes, "gm4", &["perl"]);
    write_recipe(&recipes, "perl", &[]);

    keelson()
        .args(["ls-available", "-v"])
        .arg("--recipes")
        .arg(&recipes)
        .arg("--prefix")
        .arg(tmp.path().join("prefix"))
        .assert()
        .success()
        .stdout(predicate::str::contains("gm4 1.0"))
        .stdout(predicate::str::contains(
            "source: https://dist.example/gm4-1.0.tar.gz",
        ))
        .stdout(predicate::str::contains("depends: perl"));
}

#[test]
fn test_ls_available_fails_without_catalog() {
    let tmp = TempDir::new().unwrap();

    keelson()
        .args(["ls-available"])
        .arg("--recipes")
        .arg(tmp.path().join("absent"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("recipe directory not found"));
}

// ============================================================================
// keelson install: fail-fast paths
// ============================================================================

#[test]
fn test_install_unknown_package_fails() {
    let tmp = TempDir::new().unwrap();
    let recipes = tmp.path().join("recipes");
    fs::create_dir(&recipes).unwrap();
    write_recipe(&recipes, "perl", &[]);

    keelson()
        .args(["install", "ghc"])
        .arg("--recipes")
        .arg(&recipes)
        .arg("--prefix")
        .arg(tmp.path().join("prefix"))
        .arg("--downloads")
        .arg(tmp.path().join("downloads"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown package: `ghc`"));
}

#[test]
fn test_install_rejects_dependency_cycle_before_building() {
    let tmp = TempDir::new().unwrap();
    let recipes = tmp.path().join("recipes");
    fs::create_dir(&recipes).unwrap();
    write_recipe(&recipes, "a", &["b"]);
    write_recipe(&recipes, "b", &["a"]);

    keelson()
        .args(["install", "a"])
        .arg("--recipes")
        .arg(&recipes)
        .arg("--prefix")
        .arg(tmp.path().join("prefix"))
        .arg("--downloads")
        .arg(tmp.path().join("downloads"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("cyclic dependency"));
}

#[cfg(unix)]
#[test]
fn test_install_fails_before_session_when_no_retrieval_tool() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let recipes = tmp.path().join("recipes");
    fs::create_dir(&recipes).unwrap();
    write_recipe(&recipes, "gm4", &[]);

    // A PATH with a compiler and archiver but no download tool.
    let bin = tmp.path().join("bin");
    fs::create_dir(&bin).unwrap();
    for tool in ["cc", "ar"] {
        let path = bin.join(tool);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    let session = tmp.path().join("session");

    keelson()
        .args(["install", "gm4"])
        .arg("--recipes")
        .arg(&recipes)
        .arg("--prefix")
        .arg(tmp.path().join("prefix"))
        .arg("--downloads")
        .arg(tmp.path().join("downloads"))
        .arg("--session")
        .arg(&session)
        .env_clear()
        .env("PATH", &bin)
        .env("HOME", tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no retrieval tool found"));

    // Probing happens before any session directory is created.
    assert!(!session.exists());
}

#[cfg(unix)]
#[test]
fn test_install_no_color_emits_plain_status_lines() {
    use std::os::unix::fs::PermissionsExt;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use sha2::{Digest, Sha256};

    let tmp = TempDir::new().unwrap();

    // A tiny but real archive, pre-seeded into the download cache so the
    // run is a cache hit and never goes near the network.
    let mut archive = Vec::new();
    {
        let encoder = GzEncoder::new(&mut archive, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let contents = b"#!/bin/sh\n";
        let mut header = tar::Header::new_gnu();
        header.set_path("gm4-1.0/configure").unwrap();
        header.set_size(contents.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append(&header, std::io::Cursor::new(contents))
            .unwrap();
        builder.finish().unwrap();
    }
    let sha = hex::encode(Sha256::digest(&archive));

    let downloads = tmp.path().join("downloads");
    fs::create_dir(&downloads).unwrap();
    fs::write(downloads.join(format!("{sha}.tar.gz")), &archive).unwrap();

    let recipes = tmp.path().join("recipes");
    fs::create_dir(&recipes).unwrap();
    let recipe = format!(
        r#"name = "gm4"
version = "1.0"
source = "https://dist.example/gm4-1.0.tar.gz"
sha256 = "{sha}"

[[build]]

[build.run]
program = "true"
args = []
"#
    );
    fs::write(recipes.join("gm4.toml"), recipe).unwrap();

    // Guarantee a retrieval tool exists for the probe; the cache hit means
    // it is never actually invoked.
    let bin = tmp.path().join("bin");
    fs::create_dir(&bin).unwrap();
    let curl = bin.join("curl");
    fs::write(&curl, "#!/bin/sh\nexit 1\n").unwrap();
    fs::set_permissions(&curl, fs::Permissions::from_mode(0o755)).unwrap();
    let path = format!(
        "{}:{}",
        bin.display(),
        std::env::var("PATH").unwrap_or_default()
    );

    let prefix = tmp.path().join("prefix");

    keelson()
        .args(["install", "gm4", "--no-color"])
        .arg("--recipes")
        .arg(&recipes)
        .arg("--prefix")
        .arg(&prefix)
        .arg("--downloads")
        .arg(&downloads)
        .arg("--session")
        .arg(tmp.path().join("session"))
        .env("PATH", &path)
        .env("CC", "/bin/sh")
        .env("AR", "/bin/sh")
        .assert()
        .success()
        .stderr(predicate::str::contains("Fetching gm4 1.0"))
        .stderr(predicate::str::contains("Extracting gm4 1.0"))
        .stderr(predicate::str::contains("Installed gm4 1.0"))
        .stderr(predicate::str::contains("\u{1b}[").not());

    assert!(prefix.join("gm4.toml").exists());
}

// ============================================================================
// keelson completions
// ============================================================================

#[test]
fn test_completions_bash() {
    keelson()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("keelson"));
}
