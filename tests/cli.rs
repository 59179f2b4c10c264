//! Command line behavior: exit codes, the version gate and local publishing.

use assert_cmd::Command;
use predicates::prelude::*;

#[cfg(unix)]
mod common;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("kodegen_bundler_matrix").unwrap();
    cmd.env_remove("RELEASE_TAG")
        .env_remove("GITHUB_REPOSITORY")
        .env_remove("APPLE_CERTIFICATE")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn help_lists_release_options() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--notarization-timeout"))
        .stdout(predicate::str::contains("--publish"));
}

#[test]
fn tag_mismatch_exits_before_creating_anything() {
    let tmp = tempfile::tempdir().unwrap();
    let manifest = tmp.path().join("Cargo.toml");
    std::fs::copy("tests/fixtures/Cargo.toml", &manifest).unwrap();

    cmd()
        .arg("--manifest-path")
        .arg(&manifest)
        .args(["--tag", "v1.2.4"])
        .arg("--output-dir")
        .arg(tmp.path().join("dist"))
        .arg("--work-dir")
        .arg(tmp.path().join("work"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not match manifest version `1.2.3`"));

    assert!(!tmp.path().join("dist").exists());
    assert!(!tmp.path().join("work").exists());
    assert!(!tmp.path().join("target").exists());
}

#[test]
fn unknown_target_is_rejected() {
    cmd()
        .args(["--manifest-path", "tests/fixtures/Cargo.toml"])
        .args(["--target", "freebsd-amd64", "--skip-build", "--publish", "none"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("freebsd-amd64"));
}

#[cfg(unix)]
#[test]
fn local_publish_is_idempotent_and_reports() {
    use kodegen_bundler_matrix::bundler::{PipelineReport, PipelineStatus, default_matrix};

    let project = common::Project::new();
    project.artifact(&default_matrix()[0]);

    let run = || {
        cmd()
            .arg("--manifest-path")
            .arg(project.manifest())
            .args(["--tag", "v1.2.3", "--target", "linux-amd64", "--skip-build"])
            .arg("--output-dir")
            .arg(project.output_dir())
            .assert()
            .success();
        common::listing(&project.output_dir().join("releases/1.2.3"))
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert!(first.contains(&"SHA256SUMS".to_string()));
    assert!(first.contains(&"akron-1.2.3-linux-amd64.rpm".to_string()));

    let report: PipelineReport = serde_json::from_slice(
        &std::fs::read(project.output_dir().join("report.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(report.status(), PipelineStatus::Success);
    assert_eq!(report.packages().len(), 3);
}

#[cfg(unix)]
#[test]
fn no_packages_exits_with_failure() {
    let project = common::Project::new();

    cmd()
        .arg("--manifest-path")
        .arg(project.manifest())
        .args(["--target", "linux-arm64", "--skip-build", "--publish", "local"])
        .arg("--output-dir")
        .arg(project.output_dir())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no target produced any package"));

    // The report is still written.
    assert!(project.output_dir().join("report.json").is_file());
    assert!(!project.output_dir().join("releases").exists());
}
