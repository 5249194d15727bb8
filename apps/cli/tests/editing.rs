use std::error::Error;
use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn new_writes_sample_with_canonical_extension() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    Command::cargo_bin("vanilla-studio")?
        .args(["new", "c", "--name", "hello.txt", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("hello.c"));

    let written = fs::read_to_string(dir.path().join("hello.c"))?;
    assert!(written.contains("Hello, C from Vanilla Studio!"));
    assert!(!dir.path().join("hello.txt").exists());
    Ok(())
}

#[test]
fn new_accepts_aliases_and_refuses_to_overwrite() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    Command::cargo_bin("vanilla-studio")?
        .args(["new", "rb", "--dir"])
        .arg(dir.path())
        .assert()
        .success();
    assert!(dir.path().join("untitled.rb").exists());

    Command::cargo_bin("vanilla-studio")?
        .args(["new", "ruby", "--dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    Ok(())
}

#[test]
fn highlight_prints_spans_with_positions() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = dir.path().join("demo.py");
    fs::write(&file, "# note\nx = 1\n")?;

    Command::cargo_bin("vanilla-studio")?
        .args(["highlight", "--strategy", "regex"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("0..6 comment 1:0"));
    Ok(())
}

#[test]
fn highlight_json_reports_tokenizer_and_language() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = dir.path().join("page.htm");
    fs::write(&file, "<p class=\"x\">hi</p>\n")?;

    let output = Command::cargo_bin("vanilla-studio")?
        .args(["highlight", "--strategy", "regex", "--json"])
        .arg(&file)
        .output()?;
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["language"], "html");
    assert_eq!(value["tokenizer"], "regex");
    let categories: Vec<&str> = value["spans"]
        .as_array()
        .map(|spans| spans.iter().filter_map(|span| span["category"].as_str()).collect())
        .unwrap_or_default();
    assert!(categories.contains(&"tag"));
    Ok(())
}

#[test]
fn find_prints_line_and_column() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = dir.path().join("main.go");
    fs::write(&file, "package main\n\nfunc main() {}\n")?;

    Command::cargo_bin("vanilla-studio")?
        .arg("find")
        .arg(&file)
        .arg("main()")
        .assert()
        .success()
        .stdout(predicate::str::diff("3:5\n"));

    Command::cargo_bin("vanilla-studio")?
        .arg("find")
        .arg(&file)
        .arg("absent")
        .assert()
        .success()
        .stdout(predicate::str::diff("Not found.\n"));
    Ok(())
}

#[test]
fn missing_file_is_an_error() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    Command::cargo_bin("vanilla-studio")?
        .arg("find")
        .arg(dir.path().join("nope.py"))
        .arg("x")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
    Ok(())
}

#[test]
fn highlight_color_uses_configured_palette() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = dir.path().join("x.py");
    fs::write(&file, "# c\n")?;
    let config = dir.path().join("prefs.json");
    fs::write(
        &config,
        r##"{ "highlight": { "strategy": "regex", "palette": { "comment": "#010203" } } }"##,
    )?;

    Command::cargo_bin("vanilla-studio")?
        .arg("--config")
        .arg(&config)
        .arg("highlight")
        .arg("--color")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("\u{1b}[38;2;1;2;3m# c\u{1b}[0m"));
    Ok(())
}
