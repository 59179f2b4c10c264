//! Release record assembly and publishing.
//!
//! After every target job has resolved, the collected packages of all
//! successful targets are unioned into one [`ReleaseRecord`]. A tag-triggered
//! run produces a final release, a manual run a draft development build.
//! Publishing is idempotent per version: a rerun replaces the release and its
//! assets, it never duplicates them.

mod github;
mod local;

pub use github::{GitHubStore, parse_repository};
pub use local::LocalStore;

use crate::bundler::{
    self, BundledArtifact, PackageType, PipelineReport, Settings,
    template::{self, RELEASE_BODY_TEMPLATE, TemplateData},
};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Errors raised while publishing a release.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Filesystem failure in the release store
    #[error("failed while {context} `{path}`: {source}")]
    Io {
        /// What was being done
        context: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Record serialization failed
    #[error("release record serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport failure talking to the release API
    #[error("release API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The release API answered with an error
    #[error("release API returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// No API token in the environment
    #[error("GITHUB_TOKEN is not set")]
    MissingToken,

    /// Repository could not be determined or parsed
    #[error("invalid repository `{0}` (expected owner/name or a GitHub URL)")]
    Repository(String),

    /// Malformed API URL
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Whether the release is final or a development build.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseKind {
    /// Tag-triggered release
    Final,
    /// Manually invoked development build
    Draft,
}

/// One published file.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReleaseAsset {
    /// File name
    pub name: String,
    /// Target label
    pub target: String,
    /// Package type
    pub package_type: PackageType,
    /// Size in bytes
    pub size: u64,
    /// Hex-encoded SHA-256
    pub sha256: String,
    /// Where the file currently lives
    #[serde(skip)]
    pub source: PathBuf,
}

impl From<&BundledArtifact> for ReleaseAsset {
    fn from(artifact: &BundledArtifact) -> Self {
        Self {
            name: artifact.name.clone(),
            target: artifact.target.clone(),
            package_type: artifact.package_type,
            size: artifact.size,
            sha256: artifact.sha256.clone(),
            source: artifact.path.clone(),
        }
    }
}

/// One release per version.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ReleaseRecord {
    /// Product name
    pub product: String,
    /// Release version
    pub version: String,
    /// Git tag the release is attached to
    pub tag: String,
    /// Final or draft
    pub kind: ReleaseKind,
    /// Release title
    pub title: String,
    /// Rendered release body
    pub body: String,
    /// Every package of every successful target, sorted by name
    pub assets: Vec<ReleaseAsset>,
    /// Assembly time
    pub created_at: DateTime<Utc>,
}

impl ReleaseRecord {
    /// Unions the packages of `report` into a record.
    ///
    /// `trigger_tag` marks a tag-triggered run; without one the release is a
    /// draft. Both kinds attach to the canonical `v<version>` tag so a draft
    /// and a later final release of one version share a single release.
    pub async fn assemble(
        settings: &Settings,
        report: &PipelineReport,
        trigger_tag: Option<&str>,
    ) -> bundler::Result<Self> {
        let version = settings.version();
        let kind = match trigger_tag {
            Some(_) => ReleaseKind::Final,
            None => ReleaseKind::Draft,
        };
        let tag = version.tag_name();

        let mut assets: Vec<ReleaseAsset> = report
            .packages()
            .into_iter()
            .map(ReleaseAsset::from)
            .collect();
        assets.sort_by(|a, b| a.name.cmp(&b.name));

        let listed: Vec<serde_json::Value> = assets
            .iter()
            .map(|a| serde_json::json!({ "name": a.name, "target": a.target, "sha256": a.sha256 }))
            .collect();
        let mut data = TemplateData::new();
        data.insert("productName", settings.product_name())
            .insert("version", version.as_str())
            .insert("draft", kind == ReleaseKind::Draft)
            .insert("assets", listed);

        let body = template::render(
            "release body",
            settings.bundle_settings().release_body_template.as_deref(),
            RELEASE_BODY_TEMPLATE,
            &data,
        )
        .await?;

        let title = match kind {
            ReleaseKind::Final => format!("{} {}", settings.product_name(), version),
            ReleaseKind::Draft => format!("{} {} (development build)", settings.product_name(), version),
        };

        Ok(Self {
            product: settings.product_name().to_string(),
            version: version.as_str().to_string(),
            tag,
            kind,
            title,
            body,
            assets,
            created_at: Utc::now(),
        })
    }

    /// Whether this is a draft.
    pub fn is_draft(&self) -> bool {
        self.kind == ReleaseKind::Draft
    }

    /// `SHA256SUMS` content: `<sha256>  <name>` per asset, sorted by name.
    pub fn checksums(&self) -> String {
        let mut assets: Vec<&ReleaseAsset> = self.assets.iter().collect();
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        assets
            .iter()
            .map(|a| format!("{}  {}\n", a.sha256, a.name))
            .collect()
    }
}

/// Where a release is published.
#[derive(Clone, Debug)]
pub enum ReleaseStore {
    /// `<root>/releases/<version>/` on disk
    Local(LocalStore),
    /// GitHub releases
    GitHub(GitHubStore),
}

impl ReleaseStore {
    /// Publishes `record` and its assets, replacing any previous publication
    /// of the same version. Returns where the release now lives.
    pub async fn publish(&self, record: &ReleaseRecord) -> Result<String, PublishError> {
        log::info!(
            "Publishing {} {} ({} assets)",
            record.product,
            record.version,
            record.assets.len()
        );
        let location = match self {
            ReleaseStore::Local(store) => store.publish(record).await?,
            ReleaseStore::GitHub(store) => store.publish(record).await?,
        };
        log::info!("✓ Published release {} to {}", record.tag, location);
        Ok(location)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksums_are_sorted_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        let record = test_support::record(tmp.path(), ReleaseKind::Final);
        let sums = record.checksums();
        let lines: Vec<&str> = sums.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("{}  akron-1.2.3-linux-amd64.deb", "b".repeat(64)));
        assert_eq!(lines[1], format!("{}  akron-1.2.3-linux-amd64.tar.gz", "a".repeat(64)));
    }

    #[tokio::test]
    async fn manual_runs_assemble_drafts() {
        use crate::bundler::{Pipeline, platform::test_support as fixtures};

        let tmp = tempfile::tempdir().unwrap();
        let settings = fixtures::builder(tmp.path())
            .skip_build(true)
            .build()
            .unwrap();
        // No artifacts: every target fails, the record is empty.
        let report = Pipeline::new(settings.clone(), crate::bundler::default_matrix()[..1].to_vec())
            .run()
            .await;

        let draft = ReleaseRecord::assemble(&settings, &report, None).await.unwrap();
        assert!(draft.is_draft());
        assert_eq!(draft.tag, "v1.2.3");
        assert!(draft.assets.is_empty());
        assert!(draft.body.contains("Development build of akron 1.2.3"));

        let release = ReleaseRecord::assemble(&settings, &report, Some("refs/tags/v1.2.3"))
            .await
            .unwrap();
        assert_eq!(release.kind, ReleaseKind::Final);
        assert_eq!(release.tag, "v1.2.3");
        assert!(release.body.contains("akron 1.2.3 release packages."));
    }

    #[tokio::test]
    async fn every_tag_spelling_attaches_to_the_draft_tag() {
        use crate::bundler::platform::test_support as fixtures;

        let tmp = tempfile::tempdir().unwrap();
        let settings = fixtures::settings(tmp.path());
        let report = PipelineReport {
            product: "akron".into(),
            version: "1.2.3".into(),
            status: crate::bundler::PipelineStatus::Failed,
            targets: Vec::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };

        let draft = ReleaseRecord::assemble(&settings, &report, None).await.unwrap();
        for trigger in ["1.2.3", "v1.2.3", "refs/tags/v1.2.3", "refs/tags/1.2.3"] {
            let release = ReleaseRecord::assemble(&settings, &report, Some(trigger))
                .await
                .unwrap();
            assert_eq!(release.kind, ReleaseKind::Final);
            assert_eq!(release.tag, draft.tag, "trigger `{trigger}`");
        }
    }
}
