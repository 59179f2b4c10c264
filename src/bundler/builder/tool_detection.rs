//! External tool availability checking.
//!
//! A missing tool is not an error by itself: the job that needs it fails with
//! an external tool error when it runs. The preflight only tells the operator
//! early which targets are going to fail.

use crate::bundler::{BuildTarget, OperatingSystem, utils::process::ToolSet};

/// Tools a target's job invokes.
pub fn required_tools(target: &BuildTarget, skip_build: bool) -> Vec<&'static str> {
    let mut tools = Vec::new();
    if !skip_build {
        tools.push("cargo");
    }
    match target.os {
        OperatingSystem::Linux => {}
        OperatingSystem::Darwin => tools.extend([
            "security",
            "codesign",
            "hdiutil",
            "osascript",
            "xcrun",
            "spctl",
        ]),
        OperatingSystem::Windows => tools.extend(["rcedit", "wix"]),
    }
    tools
}

/// Logs, for each target, the tools that do not resolve.
///
/// Returns the targets with missing tools and the tool names.
pub fn preflight(
    tools: &ToolSet,
    targets: &[BuildTarget],
    skip_build: bool,
) -> Vec<(BuildTarget, Vec<&'static str>)> {
    let mut report = Vec::new();
    for target in targets {
        let missing: Vec<&'static str> = required_tools(target, skip_build)
            .into_iter()
            .filter(|tool| !tools.is_available(tool))
            .collect();

        if missing.is_empty() {
            log::debug!("✓ All tools available for {}", target);
        } else {
            log::warn!(
                "{} will likely fail: {} not found",
                target.label(),
                missing.join(", ")
            );
            report.push((target.clone(), missing));
        }
    }
    report
}
