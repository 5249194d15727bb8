use std::error::Error;
use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn tree_lists_directories_first_with_indentation() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("proj");
    fs::create_dir_all(root.join("src"))?;
    fs::write(root.join("zeta.py"), "")?;
    fs::write(root.join("Alpha.c"), "")?;
    fs::write(root.join("src/lib.rs"), "")?;

    Command::cargo_bin("vanilla-studio")?
        .arg("tree")
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "Workspace: proj\nsrc/\n  lib.rs\nAlpha.c\nzeta.py\n",
        ));
    Ok(())
}

#[test]
fn tree_depth_zero_lists_top_level_only() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::create_dir_all(dir.path().join("a/b"))?;
    fs::write(dir.path().join("a/b/c.lua"), "")?;

    let output = Command::cargo_bin("vanilla-studio")?
        .args(["tree", "--depth", "0", "--json"])
        .arg(dir.path())
        .output()?;
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["nodes"][0]["name"], "a");
    assert_eq!(value["nodes"][0]["loaded"], false);
    assert!(value["nodes"][0].get("children").is_none());
    Ok(())
}

#[test]
fn tree_rejects_a_file_root() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = dir.path().join("single.py");
    fs::write(&file, "")?;
    Command::cargo_bin("vanilla-studio")?
        .arg("tree")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
    Ok(())
}

#[test]
fn config_tree_depth_applies_when_flag_is_absent() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("ws");
    fs::create_dir_all(root.join("one/two"))?;
    fs::write(root.join("one/two/deep.rs"), "")?;
    let config = dir.path().join("prefs.json");
    fs::write(&config, r#"{ "workspace": { "tree_depth": 0 } }"#)?;

    Command::cargo_bin("vanilla-studio")?
        .arg("--config")
        .arg(&config)
        .arg("tree")
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::diff("Workspace: ws\none/\n"));
    Ok(())
}

#[test]
fn malformed_config_is_reported() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("prefs.json");
    fs::write(&config, "{ nope")?;
    Command::cargo_bin("vanilla-studio")?
        .arg("--config")
        .arg(&config)
        .arg("languages")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
    Ok(())
}
