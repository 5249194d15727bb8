use std::error::Error;

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn languages_lists_every_profile() -> Result<(), Box<dyn Error>> {
    Command::cargo_bin("vanilla-studio")?
        .arg("languages")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("python")
                .and(predicate::str::contains(".py"))
                .and(predicate::str::contains("csharp"))
                .and(predicate::str::contains(".cs"))
                .and(predicate::str::contains("nix"))
                .and(predicate::str::contains("//")),
        );
    Ok(())
}

#[test]
fn unknown_language_is_rejected_by_argument_parsing() -> Result<(), Box<dyn Error>> {
    Command::cargo_bin("vanilla-studio")?
        .args(["new", "cobol"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cobol"));
    Ok(())
}
