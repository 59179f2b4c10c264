//! External tool resolution and execution.
//!
//! Every program the packagers invoke (`codesign`, `hdiutil`, `xcrun`, `wix`,
//! ...) is resolved through a [`ToolSet`], so a tool can be pinned to an exact
//! path from the manifest or the command line.

use crate::bundler::error::{Error, Result};
use std::{
    collections::HashMap,
    ffi::OsStr,
    path::{Path, PathBuf},
    process::{Output, Stdio},
};
use tokio::process::Command;

/// Maximum number of diagnostic bytes kept from a failing tool.
const MAX_DIAGNOSTICS: usize = 16 * 1024;

/// Flags whose following argument is a passphrase or password.
const SECRET_FLAGS: &[&str] = &["-p", "-P", "--password"];

/// Resolves tool names to executables.
#[derive(Clone, Debug, Default)]
pub struct ToolSet {
    overrides: HashMap<String, PathBuf>,
}

impl ToolSet {
    /// Creates a tool set with the given overrides.
    pub fn new(overrides: HashMap<String, PathBuf>) -> Self {
        Self { overrides }
    }

    /// Adds or replaces one override.
    pub fn set(&mut self, tool: impl Into<String>, path: impl Into<PathBuf>) {
        self.overrides.insert(tool.into(), path.into());
    }

    /// Program to execute for `tool`.
    pub fn program(&self, tool: &str) -> PathBuf {
        self.overrides
            .get(tool)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(tool))
    }

    /// Whether `tool` resolves to an executable.
    pub fn is_available(&self, tool: &str) -> bool {
        match self.overrides.get(tool) {
            Some(path) => path.is_file() || which::which(path).is_ok(),
            None => which::which(tool).is_ok(),
        }
    }

    /// Builds a command for `tool`. The child is killed if the future is dropped.
    pub fn command(&self, tool: &str) -> Command {
        let mut cmd = Command::new(self.program(tool));
        cmd.kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Runs `tool` with `args` and fails with its diagnostics on non-zero exit.
    pub async fn run<I, S>(&self, tool: &str, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.command(tool);
        cmd.args(args);
        run_command(tool, cmd).await
    }

    /// Like [`ToolSet::run`] with a working directory.
    pub async fn run_in<I, S>(&self, tool: &str, dir: &Path, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.command(tool);
        cmd.current_dir(dir).args(args);
        run_command(tool, cmd).await
    }
}

/// Executes a prepared command, mapping failures to tool errors.
pub async fn run_command(tool: &str, mut cmd: Command) -> Result<Output> {
    if log::log_enabled!(log::Level::Debug) {
        let inner = cmd.as_std();
        log::debug!(
            "Running {}",
            redacted_command_line(inner.get_program(), inner.get_args())
        );
    }

    let output = cmd.output().await.map_err(|error| Error::CommandFailed {
        command: tool.to_string(),
        error,
    })?;

    if !output.status.success() {
        return Err(Error::ToolFailed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            diagnostics: diagnostics(&output),
        });
    }

    Ok(output)
}

/// Renders a command line for logging with secret flag values masked.
pub fn redacted_command_line<'a>(
    program: &OsStr,
    args: impl IntoIterator<Item = &'a OsStr>,
) -> String {
    let mut line = program.to_string_lossy().into_owned();
    let mut mask_next = false;
    for arg in args {
        line.push(' ');
        if mask_next {
            line.push_str("***");
            mask_next = false;
            continue;
        }
        let arg = arg.to_string_lossy();
        match arg.split_once('=') {
            Some((flag, _)) if SECRET_FLAGS.contains(&flag) => {
                line.push_str(flag);
                line.push_str("=***");
                continue;
            }
            _ => {}
        }
        mask_next = SECRET_FLAGS.contains(&&*arg);
        line.push_str(&arg);
    }
    line
}

/// Combines stderr and stdout of a finished tool into one bounded string.
pub fn diagnostics(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let mut text = String::new();
    if !stderr.trim().is_empty() {
        text.push_str(stderr.trim());
    }
    if !stdout.trim().is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stdout.trim());
    }

    if text.len() > MAX_DIAGNOSTICS {
        let mut cut = text.len() - MAX_DIAGNOSTICS;
        while !text.is_char_boundary(cut) {
            cut += 1;
        }
        text = format!("...{}", &text[cut..]);
    }
    text
}

/// Path argument as UTF-8, as most of the Apple and WiX tooling requires.
pub fn path_arg(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        Error::GenericError(format!(
            "path contains non-UTF8 characters: {}",
            path.display()
        ))
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::bundler::FailureKind;
    use std::sync::Mutex;

    #[tokio::test]
    async fn failing_tool_carries_diagnostics() {
        let mut tools = ToolSet::default();
        tools.set("fake", "/bin/sh");
        let err = tools
            .run("fake", ["-c", "echo boom >&2; exit 3"])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::ExternalTool);
        match err {
            Error::ToolFailed { tool, diagnostics, .. } => {
                assert_eq!(tool, "fake");
                assert_eq!(diagnostics, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn secret_flag_values_are_masked() {
        let args = [
            "import",
            "cert.p12",
            "-k",
            "build.keychain",
            "-P",
            "hunter2",
            "--password=app-pw",
        ];
        let line = redacted_command_line(
            OsStr::new("security"),
            args.iter().map(OsStr::new),
        );
        assert_eq!(
            line,
            "security import cert.p12 -k build.keychain -P *** --password=***"
        );
    }

    struct CaptureLog(Mutex<Vec<String>>);

    impl log::Log for CaptureLog {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: CaptureLog = CaptureLog(Mutex::new(Vec::new()));

    #[tokio::test]
    async fn debug_log_never_contains_the_passphrase() {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Trace);

        let mut tools = ToolSet::default();
        tools.set("security", "/bin/sh");
        let mut cmd = tools.command("security");
        cmd.args(["-c", "exit 0", "create-keychain", "-p", "S3CRET-PASS", "kc"]);
        run_command("security", cmd).await.unwrap();

        let lines = CAPTURE.0.lock().unwrap();
        assert!(lines.iter().any(|l| l.contains("create-keychain -p ***")));
        assert!(lines.iter().all(|l| !l.contains("S3CRET-PASS")));
    }

    #[tokio::test]
    async fn missing_tool_is_external_tool_failure() {
        let mut tools = ToolSet::default();
        tools.set("ghost", "/nonexistent/ghost-tool");
        assert!(!tools.is_available("ghost"));
        let err = tools.run("ghost", ["--version"]).await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
        assert_eq!(err.kind(), FailureKind::ExternalTool);
    }
}
