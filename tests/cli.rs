use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("audiobinder").unwrap();
    // keep host config and env layering out of the assertions
    cmd.env("XDG_CONFIG_HOME", "/nonexistent")
        .env_remove("PATH_PATTERN")
        .env_remove("OUTPUT_PATH_PATTERN")
        .env_remove("OUTPUT_FILE_PATTERN")
        .env_remove("OUTPUT_FILE_DEST")
        .env_remove("JOBS")
        .env_remove("SCRATCH_FILES_PATH");
    cmd
}

#[test]
fn test_help_lists_bind_subcommands() {
    cmd()
        .args(["bind", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("files"))
        .stdout(predicate::str::contains("from-tags"))
        .stdout(predicate::str::contains("split-chapters"))
        .stdout(predicate::str::contains("from-cue"))
        .stdout(predicate::str::contains("tag"));
}

#[test]
fn test_bind_files_requires_source_path() {
    cmd()
        .args(["bind", "files"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--source-files-path"));
}

#[test]
fn test_use_filenames_conflicts_with_use_title_tag() {
    cmd()
        .args([
            "bind",
            "files",
            "-s",
            "/tmp/books",
            "--use-filenames",
            "--use-title-tag",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_bind_files_requires_path_pattern() {
    let temp = TempDir::new().unwrap();
    cmd()
        .args(["bind", "files", "-s"])
        .arg(temp.path())
        .args(["-o", "out/%a/%t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no path pattern defined"));
}

#[test]
fn test_dry_run_reports_parsed_tags_and_output() {
    let temp = TempDir::new().unwrap();
    let book_dir = temp.path().join("Some Author").join("Some Title");
    fs::create_dir_all(&book_dir).unwrap();
    fs::write(book_dir.join("01.mp3"), b"x").unwrap();

    let pattern = format!("{}/%a/%t", temp.path().display());

    cmd()
        .args(["bind", "files", "--dry-run", "-s"])
        .arg(&book_dir)
        .args(["-p", &pattern, "-o", "out/%a/%t"])
        .assert()
        .success()
        .stdout(predicate::str::contains("author"))
        .stdout(predicate::str::contains("Some Author"))
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("Some Author - Some Title.m4b"));
}

#[test]
fn test_mismatched_path_is_a_structured_error() {
    let temp = TempDir::new().unwrap();
    let book_dir = temp.path().join("OnlyOneSegment");
    fs::create_dir_all(&book_dir).unwrap();

    cmd()
        .args(["bind", "files", "--dry-run", "-s"])
        .arg(&book_dir)
        .args(["-p", "%a/%s/%p/%t", "-o", "out/%a/%t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no tags were parsed"));
}

#[test]
fn test_tag_rejects_non_m4b() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("book.mp3");
    fs::write(&file, b"x").unwrap();

    cmd()
        .args(["bind", "tag", "-s"])
        .arg(&file)
        .args(["-p", "%a/%t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an m4b file"));
}
