//! GitHub releases store.
//!
//! Finds the release for the record's tag (drafts included), creates or
//! updates it, removes every asset a previous run attached and uploads the
//! packages plus `SHA256SUMS`. Authentication comes from `GITHUB_TOKEN`.

use super::{PublishError, ReleaseRecord};
use regex::Regex;
use reqwest::{Client, RequestBuilder, Response, header};
use serde::Deserialize;
use std::path::Path;
use tokio_util::io::ReaderStream;
use url::Url;

const API_BASE: &str = "https://api.github.com/";
const UPLOAD_BASE: &str = "https://uploads.github.com/";
const API_VERSION: &str = "2022-11-28";

/// Splits `owner/name`, `https://github.com/owner/name(.git)` or
/// `git@github.com:owner/name.git` into owner and name.
pub fn parse_repository(repository: &str) -> Option<(String, String)> {
    let repository = repository.trim();

    let path = if let Ok(url) = Url::parse(repository) {
        if url.host_str() != Some("github.com") {
            return None;
        }
        url.path().trim_matches('/').to_string()
    } else if let Some(rest) = repository.strip_prefix("git@github.com:") {
        rest.to_string()
    } else {
        repository.to_string()
    };

    let slug = Regex::new(r"^([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?/?$").ok()?;
    let caps = slug.captures(&path)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// API and upload bases for a GitHub Enterprise `GITHUB_API_URL`
/// (`https://host/api/v3`). `None` for the public API.
fn enterprise_bases(api: &str) -> Option<(String, String)> {
    let api = api.trim().trim_end_matches('/');
    if api.is_empty() || api == API_BASE.trim_end_matches('/') {
        return None;
    }
    let upload = match api.strip_suffix("/api/v3") {
        Some(host) => format!("{host}/api/uploads/"),
        None => format!("{api}/"),
    };
    Some((format!("{api}/"), upload))
}

#[derive(Debug, Deserialize)]
struct Release {
    id: u64,
    tag_name: String,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    id: u64,
    name: String,
}

/// Publishes to one GitHub repository.
#[derive(Clone, Debug)]
pub struct GitHubStore {
    client: Client,
    token: String,
    owner: String,
    repo: String,
    api_base: Url,
    upload_base: Url,
}

impl GitHubStore {
    /// Store for `repository` using `GITHUB_TOKEN` from the environment.
    pub fn from_env(repository: &str) -> Result<Self, PublishError> {
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(PublishError::MissingToken)?;
        let store = Self::new(repository, token)?;
        match std::env::var("GITHUB_API_URL").ok().and_then(|api| enterprise_bases(&api)) {
            Some((api, upload)) => store.with_base_urls(&api, &upload),
            None => Ok(store),
        }
    }

    /// Store for `repository` with an explicit token.
    pub fn new(repository: &str, token: impl Into<String>) -> Result<Self, PublishError> {
        let (owner, repo) = parse_repository(repository)
            .ok_or_else(|| PublishError::Repository(repository.to_string()))?;
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            token: token.into(),
            owner,
            repo,
            api_base: Url::parse(API_BASE)?,
            upload_base: Url::parse(UPLOAD_BASE)?,
        })
    }

    /// Points the store at another API and upload host, such as a GitHub
    /// Enterprise server. Both bases must end with `/`.
    pub fn with_base_urls(mut self, api: &str, upload: &str) -> Result<Self, PublishError> {
        self.api_base = Url::parse(api)?;
        self.upload_base = Url::parse(upload)?;
        Ok(self)
    }

    /// `owner/name`.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn releases_url(&self, suffix: &str) -> Result<Url, PublishError> {
        Ok(self
            .api_base
            .join(&format!("repos/{}/{}/releases{}", self.owner, self.repo, suffix))?)
    }

    fn upload_url(&self, release_id: u64, name: &str) -> Result<Url, PublishError> {
        let mut url = self.upload_base.join(&format!(
            "repos/{}/{}/releases/{}/assets",
            self.owner, self.repo, release_id
        ))?;
        url.query_pairs_mut().append_pair("name", name);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Creates or updates the release, then replaces its asset set.
    pub async fn publish(&self, record: &ReleaseRecord) -> Result<String, PublishError> {
        let release = match self.find_release(&record.tag).await? {
            Some(existing) => {
                log::info!("Updating release {} ({})", existing.tag_name, existing.id);
                self.write_release(Some(existing.id), record).await?
            }
            None => {
                log::info!("Creating release {}", record.tag);
                self.write_release(None, record).await?
            }
        };

        let sums = tempfile::NamedTempFile::new().map_err(|source| PublishError::Io {
            context: "creating",
            path: std::env::temp_dir(),
            source,
        })?;
        tokio::fs::write(sums.path(), record.checksums())
            .await
            .map_err(|source| PublishError::Io {
                context: "writing",
                path: sums.path().to_path_buf(),
                source,
            })?;

        let mut uploads: Vec<(&str, &Path)> = record
            .assets
            .iter()
            .map(|a| (a.name.as_str(), a.source.as_path()))
            .collect();
        uploads.push(("SHA256SUMS", sums.path()));

        for stale in &release.assets {
            self.delete_asset(stale.id, &stale.name).await?;
        }
        for (name, path) in uploads {
            self.upload_asset(release.id, name, path).await?;
        }

        Ok(format!("https://github.com/{}/releases/tag/{}", self.slug(), record.tag))
    }

    /// Lists releases (drafts are only visible to authorized callers) and
    /// picks the one with `tag`.
    async fn find_release(&self, tag: &str) -> Result<Option<Release>, PublishError> {
        let mut page = 1u32;
        loop {
            let mut url = self.releases_url("")?;
            url.query_pairs_mut()
                .append_pair("per_page", "100")
                .append_pair("page", &page.to_string());
            let response = check(self.authorized(self.client.get(url)).send().await?).await?;
            let releases: Vec<Release> = response.json().await?;
            if releases.is_empty() {
                return Ok(None);
            }
            if let Some(found) = releases.into_iter().find(|r| r.tag_name == tag) {
                return Ok(Some(found));
            }
            page += 1;
        }
    }

    async fn write_release(&self, id: Option<u64>, record: &ReleaseRecord) -> Result<Release, PublishError> {
        let payload = serde_json::json!({
            "tag_name": record.tag,
            "name": record.title,
            "body": record.body,
            "draft": record.is_draft(),
            "prerelease": false,
        });
        let request = match id {
            Some(id) => self.client.patch(self.releases_url(&format!("/{id}"))?),
            None => self.client.post(self.releases_url("")?),
        };
        let response = check(self.authorized(request).json(&payload).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn delete_asset(&self, asset_id: u64, name: &str) -> Result<(), PublishError> {
        let url = self.releases_url(&format!("/assets/{asset_id}"))?;
        check(self.authorized(self.client.delete(url)).send().await?).await?;
        log::debug!("Deleted stale asset {} ({})", name, asset_id);
        Ok(())
    }

    async fn upload_asset(&self, release_id: u64, name: &str, path: &Path) -> Result<(), PublishError> {
        let io_error = |source| PublishError::Io {
            context: "opening release asset",
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(io_error)?;
        let size = file.metadata().await.map_err(io_error)?.len();

        let request = self
            .client
            .post(self.upload_url(release_id, name)?)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)));
        check(self.authorized(request).send().await?).await?;

        log::info!("✓ Uploaded {} ({} bytes)", name, size);
        Ok(())
    }
}

/// Turns non-success responses into [`PublishError::Api`].
async fn check(response: Response) -> Result<Response, PublishError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(PublishError::Api {
        status: status.as_u16(),
        message,
    })
}
