//! Fan-out over the target matrix and fan-in of the outcomes.
//!
//! Every target runs as its own task on a [`JoinSet`]. A failing or panicking
//! task never cancels its siblings; its failure is recorded in the
//! [`PipelineReport`] with a [`FailureKind`].

use super::job::{self, JobOutput};
use crate::bundler::{
    BuildTarget, BundleName, Settings,
    collector::BundledArtifact,
    error::{Error, FailureKind},
};
use chrono::{DateTime, Utc};
use std::{collections::HashMap, fmt, sync::Arc};
use tokio::task::JoinSet;

/// Final status of one target.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum TargetStatus {
    /// Packages were produced and collected
    Succeeded,
    /// The job failed; nothing of it is published
    Failed {
        /// Failure classification
        kind: FailureKind,
        /// Diagnostics
        message: String,
    },
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetStatus::Succeeded => f.write_str("succeeded"),
            TargetStatus::Failed { kind, .. } => write!(f, "failed ({kind})"),
        }
    }
}

/// Outcome of one target job.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TargetOutcome {
    /// The target
    pub target: BuildTarget,
    /// Its bundle name
    pub bundle_name: BundleName,
    /// Final status
    pub status: TargetStatus,
    /// Collected packages; empty unless the target succeeded
    pub packages: Vec<BundledArtifact>,
    /// Aggregation warnings
    pub warnings: Vec<String>,
    /// Job start
    pub started_at: DateTime<Utc>,
    /// Job end
    pub finished_at: DateTime<Utc>,
}

impl TargetOutcome {
    /// Whether the target produced packages.
    pub fn succeeded(&self) -> bool {
        self.status == TargetStatus::Succeeded
    }
}

/// Overall status of a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStatus {
    /// Every target succeeded
    Success,
    /// Some targets failed, at least one produced packages
    PartialSuccess,
    /// No target produced packages
    Failed,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStatus::Success => f.write_str("success"),
            PipelineStatus::PartialSuccess => f.write_str("partial success"),
            PipelineStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Fan-in result of a run, in matrix order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PipelineReport {
    /// Product name
    pub product: String,
    /// Release version
    pub version: String,
    /// Overall status
    pub status: PipelineStatus,
    /// Per-target outcomes
    pub targets: Vec<TargetOutcome>,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
}

impl PipelineReport {
    fn new(
        settings: &Settings,
        targets: Vec<TargetOutcome>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let succeeded = targets.iter().filter(|t| t.succeeded()).count();
        let status = if succeeded == 0 {
            PipelineStatus::Failed
        } else if succeeded == targets.len() {
            PipelineStatus::Success
        } else {
            PipelineStatus::PartialSuccess
        };
        Self {
            product: settings.product_name().to_string(),
            version: settings.version_string().to_string(),
            status,
            targets,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Per-target outcomes in matrix order.
    pub fn targets(&self) -> &[TargetOutcome] {
        &self.targets
    }

    /// Outcome of the target with the given label.
    pub fn target(&self, label: &str) -> Option<&TargetOutcome> {
        self.targets.iter().find(|t| t.target.label() == label)
    }

    /// Overall status.
    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    /// Every collected package, in matrix order.
    pub fn packages(&self) -> Vec<&BundledArtifact> {
        self.targets.iter().flat_map(|t| &t.packages).collect()
    }
}

/// The release pipeline over a target matrix.
#[derive(Clone, Debug)]
pub struct Pipeline {
    settings: Arc<Settings>,
    matrix: Vec<BuildTarget>,
}

impl Pipeline {
    /// Creates a pipeline. The version gate has already passed: `settings`
    /// carries the resolved version.
    pub fn new(settings: Settings, matrix: Vec<BuildTarget>) -> Self {
        Self {
            settings: Arc::new(settings),
            matrix,
        }
    }

    /// Shared settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Targets this pipeline runs.
    pub fn matrix(&self) -> &[BuildTarget] {
        &self.matrix
    }

    /// Runs every target concurrently and waits for all of them.
    pub async fn run(&self) -> PipelineReport {
        let started_at = Utc::now();
        log::info!(
            "Releasing {} {} for {} target(s)",
            self.settings.product_name(),
            self.settings.version_string(),
            self.matrix.len()
        );

        let mut set = JoinSet::new();
        let mut index_of = HashMap::new();
        for (index, target) in self.matrix.iter().enumerate() {
            let settings = Arc::clone(&self.settings);
            let target = target.clone();
            let handle = set.spawn(async move {
                let started = Utc::now();
                let result = job::run_target(&settings, &target).await;
                (started, result)
            });
            index_of.insert(handle.id(), index);
        }

        let mut outcomes: Vec<Option<TargetOutcome>> = vec![None; self.matrix.len()];
        while let Some(joined) = set.join_next_with_id().await {
            let (id, started, result) = match joined {
                Ok((id, (started, result))) => (id, started, result),
                Err(e) => {
                    let message = if e.is_panic() {
                        "target job panicked".to_string()
                    } else {
                        format!("target job was cancelled: {e}")
                    };
                    (e.id(), started_at, Err(Error::GenericError(message)))
                }
            };
            let Some(&index) = index_of.get(&id) else {
                continue;
            };
            outcomes[index] = Some(self.outcome(&self.matrix[index], started, result));
        }

        let targets: Vec<TargetOutcome> = outcomes.into_iter().flatten().collect();
        let report = PipelineReport::new(&self.settings, targets, started_at);
        log::info!("Release pipeline finished: {}", report.status);
        report
    }

    fn outcome(
        &self,
        target: &BuildTarget,
        started_at: DateTime<Utc>,
        result: crate::bundler::Result<JobOutput>,
    ) -> TargetOutcome {
        let bundle_name = BundleName::new(
            self.settings.product_name(),
            self.settings.version(),
            target,
        );
        let (status, packages, warnings) = match result {
            Ok(output) => {
                for warning in &output.warnings {
                    log::warn!("{}: {}", target.label(), warning);
                }
                (TargetStatus::Succeeded, output.packages, output.warnings)
            }
            Err(e) => {
                log::error!("{} failed ({}): {}", target.label(), e.kind(), e);
                (
                    TargetStatus::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    },
                    Vec::new(),
                    Vec::new(),
                )
            }
        };

        TargetOutcome {
            target: target.clone(),
            bundle_name,
            status,
            packages,
            warnings,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
