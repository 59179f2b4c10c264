//! Command line interface.
//!
//! One invocation is one release run: version gate, matrix fan-out, fan-in
//! report, then publishing.

mod args;
mod output;

pub use args::{Args, PublishMode};
pub use output::OutputManager;

use crate::bundler::{
    PipelineReport, PipelineStatus, SettingsBuilder, TargetStatus, default_matrix,
    filter_matrix, load_mac_credentials, preflight,
};
use crate::error::{BundlerError, CliError, Result};
use crate::publish::{GitHubStore, LocalStore, ReleaseRecord, ReleaseStore};
use std::time::Duration;

/// Main CLI entry point. Returns the process exit code.
pub async fn run() -> i32 {
    let args = Args::parse_args();
    let output = OutputManager::new(args.verbose, args.quiet);

    match execute(args, &output).await {
        Ok(_) => 0,
        Err(e) => {
            let _ = output.error(&e.to_string());
            1
        }
    }
}

/// Runs one release with already-parsed arguments.
pub async fn execute(args: Args, output: &OutputManager) -> Result<PipelineReport> {
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let manifest = crate::metadata::load_manifest(&args.manifest_path)?;

    // Nothing is built or created before the gate passes.
    let version = crate::version::resolve(&manifest.raw, args.tag.as_deref())?;
    output.success(&format!(
        "{} {} ({})",
        manifest.package.product_name,
        version,
        if args.tag.is_some() { "tagged release" } else { "development build" }
    ))?;

    let matrix = filter_matrix(default_matrix(), &args.targets).map_err(|unknown| {
        CliError::InvalidArguments {
            reason: format!("unknown target(s): {}", unknown.join(", ")),
        }
    })?;

    // Bad credentials fail the macOS targets, not the run.
    let mac_credentials =
        match load_mac_credentials(manifest.bundle.macos.signing_identity.as_deref()) {
            Ok(credentials) => credentials,
            Err(e) => {
                output.warn(&format!("macOS signing disabled: {e}"))?;
                None
            }
        };

    let repository = args
        .github_repo
        .clone()
        .or_else(|| manifest.package.repository.clone());

    let mut builder = SettingsBuilder::new()
        .project_dir(&manifest.dir)
        .package_settings(manifest.package)
        .bundle_settings(manifest.bundle)
        .version(version)
        .skip_build(args.skip_build)
        .keep_work(args.keep_work)
        .mac_credentials(mac_credentials);
    if let Some(dir) = &args.target_dir {
        builder = builder.target_dir(dir);
    }
    if let Some(dir) = &args.work_dir {
        builder = builder.work_dir(dir);
    }
    if let Some(dir) = &args.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(secs) = args.notarization_timeout {
        builder = builder.notarization_timeout(Duration::from_secs(secs));
    }
    for (name, path) in &args.tools {
        builder = builder.tool(name.clone(), path);
    }
    let settings = builder.build()?;

    // Resolve the store up front so a bad repository fails before any build.
    let store = match args.publish {
        PublishMode::None => None,
        PublishMode::Local => Some(ReleaseStore::Local(LocalStore::new(settings.output_dir()))),
        PublishMode::Github => {
            let repository = repository.ok_or_else(|| CliError::MissingArgument {
                argument: "--github-repo".to_string(),
            })?;
            Some(ReleaseStore::GitHub(GitHubStore::from_env(&repository)?))
        }
    };

    output.section("Preflight")?;
    let missing = preflight(settings.tools(), &matrix, settings.skip_build());
    if missing.is_empty() {
        output.indent("all external tools found")?;
    }
    for (target, tools) in &missing {
        output.warn(&format!("{}: missing {}", target.label(), tools.join(", ")))?;
    }

    output.section("Packaging")?;
    for target in &matrix {
        output.progress(&format!("{target}"))?;
    }
    let pipeline = crate::bundler::Pipeline::new(settings.clone(), matrix);
    let report = pipeline.run().await;

    let report_path = write_report(&report, settings.output_dir()).await?;
    output.verbose(&format!("report written to {}", report_path.display()))?;
    print_summary(&report, output)?;

    if report.status() == PipelineStatus::Failed {
        return Err(BundlerError::NoPackages);
    }

    let record = ReleaseRecord::assemble(&settings, &report, args.tag.as_deref()).await?;
    match store {
        Some(store) => {
            output.section("Publishing")?;
            let location = store.publish(&record).await?;
            output.success(&format!(
                "{} {} {} published to {}",
                record.product,
                record.version,
                if record.is_draft() { "draft" } else { "release" },
                location
            ))?;
        }
        None => output.indent(&format!(
            "publishing disabled; release {} has {} asset(s)",
            record.tag,
            record.assets.len()
        ))?,
    }

    Ok(report)
}

/// Writes `report.json` into `output_dir`.
async fn write_report(report: &PipelineReport, output_dir: &std::path::Path) -> Result<std::path::PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;
    let path = output_dir.join("report.json");
    tokio::fs::write(&path, serde_json::to_vec_pretty(report)?).await?;
    Ok(path)
}

/// Prints the per-target status table.
fn print_summary(report: &PipelineReport, output: &OutputManager) -> std::io::Result<()> {
    output.section(&format!("Summary: {}", report.status()))?;
    let width = report
        .targets()
        .iter()
        .map(|t| t.target.label().len())
        .max()
        .unwrap_or(0);

    for outcome in report.targets() {
        let label = format!("{:width$}", outcome.target.label());
        match &outcome.status {
            TargetStatus::Succeeded => {
                let names: Vec<&str> = outcome.packages.iter().map(|p| p.name.as_str()).collect();
                output.success(&format!("{label}  {}", names.join(", ")))?;
            }
            TargetStatus::Failed { kind, message } => {
                output.error(&format!("{label}  {kind}: {message}"))?;
            }
        }
        for warning in &outcome.warnings {
            output.indent(&format!("warning: {warning}"))?;
        }
    }
    Ok(())
}
