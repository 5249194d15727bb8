use std::error::Error;
use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn missing_interpreter_is_reported_on_the_console() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let empty_path = dir.path().join("bin");
    fs::create_dir(&empty_path)?;
    let file = dir.path().join("script.rb");
    fs::write(&file, "puts 'hi'\n")?;

    Command::cargo_bin("vanilla-studio")?
        .env("PATH", &empty_path)
        .arg("run")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "Running script.rb (ruby)...\nRuby not found in PATH.\n",
        ));
    Ok(())
}

#[test]
fn language_override_selects_the_recipe() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let empty_path = dir.path().join("bin");
    fs::create_dir(&empty_path)?;
    let file = dir.path().join("notes.txt");
    fs::write(&file, "print 1\n")?;

    Command::cargo_bin("vanilla-studio")?
        .env("PATH", &empty_path)
        .args(["run", "--language", "lua"])
        .arg(&file)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("(lua)...").and(predicate::str::contains("lua not found in PATH.")),
        );
    Ok(())
}

#[test]
fn unknown_extension_runs_as_python() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let empty_path = dir.path().join("bin");
    fs::create_dir(&empty_path)?;
    let file = dir.path().join("data.unknown");
    fs::write(&file, "print(1)\n")?;

    Command::cargo_bin("vanilla-studio")?
        .env("PATH", &empty_path)
        .arg("run")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Python interpreter (python3) not found in PATH.",
        ));
    Ok(())
}

#[test]
fn unreadable_file_fails_before_running() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    Command::cargo_bin("vanilla-studio")?
        .arg("run")
        .arg(dir.path().join("missing.c"))
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
    Ok(())
}

#[test]
fn unknown_language_tag_is_reported_on_the_console() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = dir.path().join("x.py");
    fs::write(&file, "print(1)\n")?;

    Command::cargo_bin("vanilla-studio")?
        .args(["run", "--language", "cobol"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "Running x.py (cobol)...\nUnknown language: cannot run.\n",
        ));
    Ok(())
}

#[cfg(unix)]
fn install_tool(bin: &std::path::Path, name: &str, script: &str) -> Result<(), Box<dyn Error>> {
    use std::os::unix::fs::PermissionsExt;

    let path = bin.join(name);
    fs::write(&path, script)?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(unix)]
#[test]
fn relative_file_runs_from_its_own_directory() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let bin = dir.path().join("bin");
    fs::create_dir(&bin)?;
    install_tool(&bin, "ruby", "#!/bin/sh\n/bin/cat \"$1\"\n")?;
    fs::create_dir(dir.path().join("src"))?;
    fs::write(dir.path().join("src/x.rb"), "puts 'relative'\n")?;

    Command::cargo_bin("vanilla-studio")?
        .current_dir(dir.path())
        .env("PATH", &bin)
        .args(["run", "src/x.rb"])
        .assert()
        .success()
        .stdout(predicate::str::diff("Running x.rb (ruby)...\nputs 'relative'\n"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn bare_file_name_compiles_and_runs_artifact() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let bin = dir.path().join("bin");
    fs::create_dir(&bin)?;
    install_tool(
        &bin,
        "gcc",
        "#!/bin/sh\nprintf '#!/bin/sh\\necho built\\n' > \"$3\"\n/bin/chmod +x \"$3\"\n",
    )?;
    fs::write(dir.path().join("top.c"), "int main(void) { return 0; }\n")?;

    Command::cargo_bin("vanilla-studio")?
        .current_dir(dir.path())
        .env("PATH", &bin)
        .args(["run", "top.c"])
        .assert()
        .success()
        .stdout(predicate::str::diff("Running top.c (c)...\nbuilt\n"));
    Ok(())
}
