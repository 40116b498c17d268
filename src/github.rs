//! A small client for the GitHub release API
//!
//! We only speak two endpoints: get-release-by-tag (to learn which versions
//! are already published, and the release id to upload to) and
//! upload-release-asset. No retries -- a flaky server fails the run, which is
//! what we want from something that runs unattended in automation.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use axoasset::reqwest::{
    self,
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, StatusCode,
};
use miette::Diagnostic;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::net::ClientSettings;

/// A Result returned by the GitHub client
pub type GithubResult<T> = std::result::Result<T, GithubError>;

/// The env var we read the api token from
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

const API_SERVER: &str = "api.github.com";
const UPLOAD_SERVER: &str = "uploads.github.com";
const API_VERSION: &str = "2022-11-28";

/// An error from talking to the GitHub api
#[derive(Error, Debug, Diagnostic)]
#[error("couldn't {operation}")]
pub struct GithubError {
    /// What we were trying to do
    pub operation: String,
    /// Extra context, usually the endpoint we were hitting
    #[help]
    pub help: Option<String>,
    /// What actually went wrong
    #[source]
    #[diagnostic_source]
    pub cause: GithubErrorInner,
}

impl GithubError {
    /// Wrap a cause with the operation that was being attempted
    pub fn new(operation: impl Into<String>, cause: impl Into<GithubErrorInner>) -> Self {
        Self {
            operation: operation.into(),
            help: None,
            cause: cause.into(),
        }
    }

    /// Like [`GithubError::new`], also remembering the endpoint
    pub fn with_url(
        operation: impl Into<String>,
        url: impl std::fmt::Display,
        cause: impl Into<GithubErrorInner>,
    ) -> Self {
        Self {
            operation: operation.into(),
            help: Some(format!("was accessing this endpoint: {url}")),
            cause: cause.into(),
        }
    }
}

/// The underlying cause of a [`GithubError`]
#[derive(Error, Debug, Diagnostic)]
pub enum GithubErrorInner {
    /// http-level failure
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    /// The server answered with an error status
    #[error("server error {status}: {message}")]
    ResponseError {
        /// http status of the response
        status: StatusCode,
        /// whatever message the server offered (or the raw body)
        message: String,
    },

    /// The credential was absent or unusable
    #[error("failed to load GitHub api credentials: {reason}")]
    #[diagnostic(help("is {env_var_name} properly set?"))]
    AuthToken {
        /// why we rejected it
        reason: &'static str,
        /// the env var we looked in
        env_var_name: &'static str,
    },
}

/// An authenticated client for the GitHub release api
///
/// This type intentionally does not implement Debug, to avoid leaking the
/// authentication token baked into its headers.
#[derive(Clone)]
pub struct GithubClient(Arc<GithubClientInner>);

#[doc(hidden)]
/// Implementation detail of GithubClient
///
/// DO NOT IMPLEMENT DEBUG ON THIS TYPE, IT CONTAINS A SECRET API TOKEN AT RUNTIME
pub struct GithubClientInner {
    /// Auth (and protocol) headers for every request
    auth_headers: HeaderMap,
    /// The underlying request pool
    client: Client,
}

impl std::ops::Deref for GithubClient {
    type Target = GithubClientInner;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A release, as GitHub reports it (fields we don't use are dropped in decode)
#[derive(Deserialize, Debug, Clone)]
pub struct Release {
    /// numeric id, needed for uploads
    pub id: u64,
    /// the tag the release was cut from
    pub tag_name: String,
    /// the files attached to the release
    pub assets: Vec<ReleaseAsset>,
}

/// One file attached to a release
#[derive(Deserialize, Debug, Clone)]
pub struct ReleaseAsset {
    /// the asset's filename
    pub name: String,
}

#[derive(Deserialize, Debug, Clone)]
struct ApiErrorBody {
    message: String,
}

impl GithubClient {
    /// Create an authenticated client.
    ///
    /// The token is sourced from the `GITHUB_TOKEN` environment variable;
    /// it's an error for that variable to be missing or empty.
    pub fn new(settings: &ClientSettings) -> GithubResult<Self> {
        const DESC: &str = "create http client for the GitHub api";

        let auth_headers = auth_headers().map_err(|e| GithubError::new(DESC, e))?;
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(crate::net::USER_AGENT)
            .build()
            .map_err(|e| GithubError::new(DESC, e))?;

        Ok(Self(Arc::new(GithubClientInner {
            auth_headers,
            client,
        })))
    }

    /// Fetch a release by its tag.
    ///
    /// "No release at that tag" is an error here (404 from the server), not an
    /// empty result -- the release is the destination for uploads, so a run
    /// without one can't do anything useful.
    pub async fn get_release_by_tag(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> GithubResult<Release> {
        let desc = format!("get release {tag} of {owner}/{repo}");
        let url = format!("https://{API_SERVER}/repos/{owner}/{repo}/releases/tags/{tag}");
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers.clone())
            .send()
            .await
            .map_err(|e| GithubError::with_url(&desc, &url, e))?;

        process_response(response)
            .await
            .map_err(|e| GithubError::with_url(&desc, &url, e))
    }

    /// Upload one file as a release asset, under the given name and media type.
    ///
    /// GitHub rejects name collisions with an existing asset; that surfaces
    /// here as a plain server error, we don't try to be clever about it.
    pub async fn upload_release_asset(
        &self,
        owner: &str,
        repo: &str,
        release_id: u64,
        name: &str,
        media_type: &str,
        data: Vec<u8>,
    ) -> GithubResult<()> {
        let desc = format!("upload {name} to the release assets of {owner}/{repo}");
        let url = format!(
            "https://{UPLOAD_SERVER}/repos/{owner}/{repo}/releases/{release_id}/assets?name={name}"
        );
        let response = self
            .client
            .post(&url)
            // Give file uploads a way beefier timeout
            .timeout(Duration::from_secs(60 * 3))
            .headers(self.auth_headers.clone())
            .header("content-type", media_type)
            .body(data)
            .send()
            .await
            .map_err(|e| GithubError::with_url(&desc, &url, e))?;

        process_response_basic(response)
            .await
            .map_err(|e| GithubError::with_url(&desc, &url, e))
    }
}

/// The versions already published to a release, judged by its asset names.
///
/// An asset counts if its name starts with
/// `python_<major>.<minor>.<patch>_linux_<arch>`; the captured dotted version
/// is the set member. Anything else attached to the release is silently
/// ignored, so stray files can't break the diff.
pub fn published_versions(release: &Release, arch: &str) -> BTreeSet<String> {
    let pattern = Regex::new(&format!(
        r"^python_(\d+\.\d+\.\d+)_linux_{}",
        regex::escape(arch)
    ))
    .expect("published-asset pattern didn't compile");

    release
        .assets
        .iter()
        .filter_map(|asset| pattern.captures(&asset.name))
        .map(|captures| captures[1].to_owned())
        .collect()
}

fn auth_headers() -> std::result::Result<HeaderMap, GithubErrorInner> {
    // extra-awkward code so you're on your toes and properly treat this like radioactive waste
    // DO NOT UNDER ANY CIRCUMSTANCES PRINT THIS VALUE.
    let auth = {
        let Ok(token) = std::env::var(TOKEN_ENV_VAR) else {
            return Err(GithubErrorInner::AuthToken {
                reason: "could not load env var",
                env_var_name: TOKEN_ENV_VAR,
            });
        };
        if token.is_empty() {
            return Err(GithubErrorInner::AuthToken {
                reason: "no value in env var",
                env_var_name: TOKEN_ENV_VAR,
            });
        }
        let Ok(mut auth) = HeaderValue::from_str(&format!("Bearer {token}")) else {
            return Err(GithubErrorInner::AuthToken {
                reason: "had invalid characters for an http header",
                env_var_name: TOKEN_ENV_VAR,
            });
        };
        auth.set_sensitive(true);
        auth
    };

    Ok(HeaderMap::from_iter([
        (HeaderName::from_static("authorization"), auth),
        (
            HeaderName::from_static("accept"),
            HeaderValue::from_static("application/vnd.github+json"),
        ),
        (
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static(API_VERSION),
        ),
    ]))
}

async fn process_response<T: for<'a> Deserialize<'a>>(
    response: reqwest::Response,
) -> std::result::Result<T, GithubErrorInner> {
    // don't use error_for_status, we want to surface the server's message
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        return axoasset::serde_json::from_str(&text).map_err(|e| {
            GithubErrorInner::ResponseError {
                status,
                message: format!("unintelligible response body ({e})"),
            }
        });
    }

    Err(response_error(status, text))
}

async fn process_response_basic(
    response: reqwest::Response,
) -> std::result::Result<(), GithubErrorInner> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        return Ok(());
    }

    Err(response_error(status, text))
}

fn response_error(status: StatusCode, text: String) -> GithubErrorInner {
    // GitHub errors are json with a "message"; fall back to the raw body
    let message = axoasset::serde_json::from_str::<ApiErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);
    GithubErrorInner::ResponseError { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release_with_assets(names: &[&str]) -> Release {
        Release {
            id: 1,
            tag_name: "v0.0.0".to_owned(),
            assets: names
                .iter()
                .map(|name| ReleaseAsset {
                    name: (*name).to_owned(),
                })
                .collect(),
        }
    }

    #[test]
    fn conforming_asset_names_contribute_their_version() {
        let release = release_with_assets(&[
            "python_3.11.4_linux_arm64.tgz",
            "python_3.12.2_linux_arm64.tgz",
            "python_3.12.2_linux_arm64.tgz.checksum",
        ]);
        let versions = published_versions(&release, "arm64");
        assert_eq!(
            versions.into_iter().collect::<Vec<_>>(),
            vec!["3.11.4", "3.12.2"]
        );
    }

    #[test]
    fn non_conforming_asset_names_contribute_nothing() {
        let release = release_with_assets(&[
            // wrong prefix
            "cpython_3.11.4_linux_arm64.tgz",
            // no patch segment
            "python_3.11_linux_arm64.tgz",
            // wrong arch marker
            "python_3.11.4_linux_x64.tgz",
            // not an artifact at all
            "README.md",
        ]);
        assert!(published_versions(&release, "arm64").is_empty());
    }

    #[test]
    fn duplicate_versions_across_assets_collapse() {
        let release = release_with_assets(&[
            "python_3.11.4_linux_arm64.tgz",
            "python_3.11.4_linux_arm64.tgz.checksum",
            "python_3.11.4_linux_arm64_jammy.tgz",
        ]);
        assert_eq!(published_versions(&release, "arm64").len(), 1);
    }

    #[test]
    fn arch_marker_is_honored() {
        let release = release_with_assets(&["python_3.11.4_linux_amd64.tgz"]);
        assert!(published_versions(&release, "arm64").is_empty());
        assert_eq!(published_versions(&release, "amd64").len(), 1);
    }
}
