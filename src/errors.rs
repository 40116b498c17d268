//! Errors!

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

use crate::github::GithubError;

/// A Result returned by cpython-dist
pub type Result<T> = std::result::Result<T, CpythonDistError>;

/// An Error/Diagnostic returned by cpython-dist
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum CpythonDistError {
    /// Axoasset returned an error (I/O, or a spanned toml parse failure)
    #[error(transparent)]
    #[diagnostic(transparent)]
    Asset(#[from] axoasset::AxoassetError),

    /// The GitHub release API returned an error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Github(#[from] GithubError),

    /// A docker invocation failed to spawn or exited non-zero
    #[error(transparent)]
    #[diagnostic(transparent)]
    BuildTool(#[from] axoprocess::AxoprocessError),

    /// The request for the buildpack source archive failed outright
    #[error("cannot download buildpack source from {url}")]
    FetchSource {
        /// url we were fetching
        url: String,
        /// underlying request failure
        #[source]
        details: axoasset::AxoassetError,
    },

    /// The source server answered, but not with the archive
    #[error("server returned {status} when fetching buildpack source from {url}")]
    #[diagnostic(help("is the buildpack source url correct?"))]
    FetchSourceStatus {
        /// url we were fetching
        url: String,
        /// the non-success http status
        status: axoasset::reqwest::StatusCode,
    },

    /// The archive download broke off mid-body
    #[error("failed reading the buildpack source download from {url}")]
    FetchSourceBody {
        /// url we were fetching
        url: String,
        /// underlying read failure
        #[source]
        details: axoasset::reqwest::Error,
    },

    /// The downloaded bytes couldn't be gunzipped/untarred
    #[error("cannot extract buildpack source archive into {dest}")]
    #[diagnostic(help("is the source url pointing at a gzipped tarball?"))]
    ExtractSource {
        /// where we were unpacking to
        dest: Utf8PathBuf,
        /// underlying decompression/unpack failure
        #[source]
        details: std::io::Error,
    },

    /// The extracted source doesn't have a buildpack.toml where we expect one
    #[error("cannot find {path}")]
    #[diagnostic(help(
        "does the buildpack source actually ship a buildpack.toml at its root?"
    ))]
    MissingBuildpackManifest {
        /// path we looked at
        path: Utf8PathBuf,
    },

    /// Couldn't make a scratch dir for the run
    #[error("cannot create a temporary directory")]
    CreateTempDir {
        /// underlying io failure
        #[source]
        details: std::io::Error,
    },

    /// Walking the shared build output directory failed
    #[error("couldn't walk the build output directory {dir}")]
    WalkOutputDir {
        /// dir we were walking
        dir: Utf8PathBuf,
        /// underlying io failure
        #[source]
        details: std::io::Error,
    },

    /// The operator asked us to stop
    #[error("interrupted")]
    #[diagnostic(help("interrupt again to terminate immediately"))]
    Interrupted,
}
