//! Target-scoped error types for packaging operations.
//!
//! Every failure inside one target job is a [`Error`]. Each error classifies
//! itself into a [`FailureKind`] so the orchestrator can report a failed target
//! without inspecting error strings.

use std::{fmt::Display, io, path::PathBuf, time::Duration};

/// Result type alias for packaging operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a target failure, surfaced in per-target status.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Invalid packaging settings or a user template that does not render.
    Configuration,
    /// Absent artifact, icon source or template.
    MissingInput,
    /// A packaging, conversion or compilation subprocess failed.
    ExternalTool,
    /// Code signing or notarization failure/rejection.
    Trust,
    /// Anything else (I/O on the working area, task panics).
    Internal,
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Configuration => "configuration",
            FailureKind::MissingInput => "missing input",
            FailureKind::ExternalTool => "external tool",
            FailureKind::Trust => "trust",
            FailureKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Errors produced while staging, packaging, signing or collecting one target.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error with additional context.
    #[error("{context}: {source}")]
    Context {
        /// What was being done
        context: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// IO error
    #[error("`{0}`")]
    IoError(#[from] io::Error),

    /// Filesystem error with the path that failed
    #[error("failed while {context} `{path}`: {error}")]
    Fs {
        /// What was being done
        context: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        error: io::Error,
    },

    /// The compiled binary for a target does not exist.
    #[error("artifact not found for {target}: {path}")]
    MissingArtifact {
        /// Target triple
        target: String,
        /// Expected artifact path
        path: PathBuf,
    },

    /// A required source icon is absent or has the wrong size.
    #[error("missing {size}x{size} source icon: {path}")]
    MissingIcon {
        /// Required pixel size
        size: u32,
        /// Expected icon path
        path: PathBuf,
    },

    /// Packaging settings are incomplete or malformed.
    #[error("invalid packaging settings: {0}")]
    InvalidSettings(String),

    /// A configured template file does not exist.
    #[error("template not found: {0}")]
    MissingTemplate(PathBuf),

    /// Template registration or rendering failed.
    #[error("failed to render template `{name}`: {reason}")]
    Template {
        /// Template name
        name: String,
        /// Renderer diagnostic
        reason: String,
    },

    /// The external program could not be spawned at all.
    #[error("failed to run `{command}`: {error}")]
    CommandFailed {
        /// Program name
        command: String,
        /// Spawn error
        error: io::Error,
    },

    /// The external program ran and failed. Diagnostics hold its output.
    #[error("`{tool}` failed ({status}):\n{diagnostics}")]
    ToolFailed {
        /// Program name
        tool: String,
        /// Exit status description
        status: String,
        /// Captured stderr/stdout
        diagnostics: String,
    },

    /// Code signing or signature verification failed.
    #[error("code signing failed: {0}")]
    Signing(String),

    /// The notarization authority rejected the submission.
    #[error("notarization rejected (submission {submission_id}, status {status}){log}")]
    NotarizationRejected {
        /// Submission identifier
        submission_id: String,
        /// Status reported by the authority
        status: String,
        /// Optional developer log excerpt
        log: String,
    },

    /// No verdict arrived within the configured bound.
    #[error("notarization did not complete within {0:?}")]
    NotarizationTimeout(Duration),

    /// Stapled ticket or signature did not verify.
    #[error("trust verification failed: {0}")]
    TrustVerification(String),

    /// A macOS packaging stage was invoked out of order.
    #[error("invalid macOS packaging transition from {from} to {to}")]
    InvalidTransition {
        /// Current stage
        from: String,
        /// Requested stage
        to: String,
    },

    /// Unsupported architecture for a package format
    #[error("Architecture error: {0}")]
    ArchError(String),

    /// Generic error
    #[error("{0}")]
    GenericError(String),

    /// Path prefix error
    #[error(transparent)]
    StripPrefix(#[from] std::path::StripPrefixError),

    /// Directory walk error
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),

    /// Image decoding error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Zip archive error
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// RPM builder error
    #[error("rpm error: {0}")]
    Rpm(#[from] rpm::Error),

    /// Property list error
    #[error("plist error: {0}")]
    Plist(#[from] plist::Error),

    /// JSON error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Glob pattern error
    #[error("glob error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Classify this error for per-target status reporting.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Context { source, .. } => source.kind(),
            Error::MissingArtifact { .. } | Error::MissingIcon { .. } | Error::MissingTemplate(_) => {
                FailureKind::MissingInput
            }
            Error::InvalidSettings(_) | Error::Template { .. } => FailureKind::Configuration,
            Error::CommandFailed { .. } | Error::ToolFailed { .. } => FailureKind::ExternalTool,
            Error::Signing(_)
            | Error::NotarizationRejected { .. }
            | Error::NotarizationTimeout(_)
            | Error::TrustVerification(_)
            | Error::InvalidTransition { .. } => FailureKind::Trust,
            _ => FailureKind::Internal,
        }
    }
}

/// Attach context to errors.
pub trait Context<T> {
    /// Wrap the error with a fixed context message.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Wrap the error with a lazily evaluated context message.
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context {
            context: context.to_string(),
            source: Box::new(e),
        })
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context {
            context: f().to_string(),
            source: Box::new(e),
        })
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Attach a path to raw I/O errors.
pub trait ErrorExt<T> {
    /// Map an I/O error into [`Error::Fs`] naming the path involved.
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Return early with a [`Error::GenericError`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::Error::GenericError(format!($msg)))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_preserves_kind_of_inner_error() {
        let inner: Result<()> = Err(Error::ToolFailed {
            tool: "wix".into(),
            status: "exit status: 1".into(),
            diagnostics: "error WIX0001".into(),
        });
        let err = inner.context("compiling installer").unwrap_err();
        assert_eq!(err.kind(), FailureKind::ExternalTool);
        assert!(err.to_string().starts_with("compiling installer: "));
    }

    #[test]
    fn trust_and_missing_input_are_distinct() {
        let rejected = Error::NotarizationRejected {
            submission_id: "abc".into(),
            status: "Invalid".into(),
            log: String::new(),
        };
        let icon = Error::MissingIcon {
            size: 32,
            path: PathBuf::from("icon_32x32.png"),
        };
        assert_eq!(rejected.kind(), FailureKind::Trust);
        assert_eq!(icon.kind(), FailureKind::MissingInput);
    }
}
