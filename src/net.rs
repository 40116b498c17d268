//! Centralized logic for initializing http clients to
//! ensure uniform configuration.

use std::time::Duration;

use axoasset::reqwest;

use crate::errors::Result;
use crate::github::GithubClient;

/// The user-agent every request goes out with (GitHub requires one)
pub const USER_AGENT: &str = concat!("cpython-dist/", env!("CARGO_PKG_VERSION"));

/// Settings for http clients
///
/// Any settings that should apply to all http requests should
/// be stored here, to avoid different configurations.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// baseline request timeout (uploads get a beefier per-request override)
    pub timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientSettings {
    /// Create new ClientSettings using all necessary values
    pub fn new() -> Self {
        Self::default()
    }
}

fn create_reqwest_client(settings: &ClientSettings) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(settings.timeout)
        .user_agent(USER_AGENT)
        .build()
        .expect("failed to initialize http client")
}

/// Create the AxoClient used for plain file downloads
///
/// Ideally this should be called only once and reused!
pub fn create_asset_client(settings: &ClientSettings) -> axoasset::AxoClient {
    axoasset::AxoClient::with_reqwest(create_reqwest_client(settings))
}

/// Create the authenticated GitHub client (reads the credential from the env)
pub fn create_github_client(settings: &ClientSettings) -> Result<GithubClient> {
    Ok(GithubClient::new(settings)?)
}
