#![deny(missing_docs)]
#![allow(clippy::result_large_err)]

//! # cpython-dist
//!
//! This is the library behind the `cpython-dist` CLI, a small orchestrator
//! that keeps a GitHub release stocked with compiled CPython builds for the
//! cpython buildpack. It downloads the buildpack source, reads the versions
//! the buildpack declares, diffs them against the versions already published
//! as release assets, compiles whatever is missing inside a container image
//! the buildpack itself ships, and uploads the results.
//!
//! It happily writes progress to stderr whenever it pleases, so it's not
//! terribly well-suited to being used as a pure library; it exists as one for
//! the sake of internal documentation/testing.

use std::collections::BTreeSet;

use camino::Utf8PathBuf;
use temp_dir::TempDir;
use tokio::runtime::Handle;

use crate::build::Docker;
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::errors::{CpythonDistError, Result};

pub mod build;
pub mod cancel;
pub mod config;
pub mod errors;
pub mod github;
pub mod manifest;
pub mod net;
pub mod publish;
pub mod source;
#[cfg(test)]
mod tests;

/// Compile and publish every declared-but-unpublished CPython version.
///
/// This is the whole pipeline: fetch source, read declared versions, list
/// published versions, diff, compile the difference, upload the artifacts.
/// Every step either completes or fails the run; there is no retry and no
/// partial-success continuation anywhere.
pub fn do_compile(cfg: &Config, cancel: &CancelToken, handle: &Handle) -> Result<()> {
    let settings = net::ClientSettings::new();
    // Constructing the github client up front means a missing credential
    // fails the run before we've downloaded or compiled anything.
    let github = net::create_github_client(&settings)?;
    let assets = net::create_asset_client(&settings);

    let src = source::fetch_buildpack_source(cfg, cancel, handle, &assets)?;
    let required = manifest::declared_versions(src.root())?;

    cancel.check()?;
    let release = handle.block_on(github.get_release_by_tag(
        &cfg.owner,
        &cfg.repo,
        &cfg.release_tag,
    ))?;
    let published = github::published_versions(&release, &cfg.arch);

    let missing = plan_missing(&required, &published);
    if missing.is_empty() {
        eprintln!("all declared versions are already published, nothing to compile");
        return Ok(());
    }

    let out_tmp =
        TempDir::new().map_err(|details| CpythonDistError::CreateTempDir { details })?;
    let out_dir = Utf8PathBuf::from_path_buf(out_tmp.path().to_owned())
        .expect("temp dir made non-utf8 path!?");

    build::compile_versions(&Docker, cfg, cancel, src.root(), &out_dir, &missing)?;
    publish::publish_artifacts(cfg, cancel, handle, &github, &release, &out_dir)?;

    eprintln!("compiled and published {} version(s)", missing.len());
    Ok(())
}

/// The versions that still need compiling: required minus published.
///
/// Already-satisfied versions get a skip line on stderr so the operator can
/// see why a run did less work than the buildpack declares. The result is
/// sorted, but nothing downstream is allowed to care about the order.
pub fn plan_missing(required: &BTreeSet<String>, published: &BTreeSet<String>) -> Vec<String> {
    let mut missing = Vec::new();
    for version in required {
        if published.contains(version) {
            eprintln!("already published: {version}");
        } else {
            missing.push(version.clone());
        }
    }
    missing
}
