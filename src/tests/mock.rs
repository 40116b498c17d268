//! Mock testing utils: a recording container runtime and canned fixtures

use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};

use crate::build::ContainerRuntime;
use crate::config::Config;
use crate::errors::Result;
use crate::github::{Release, ReleaseAsset};

pub const SOURCE_URL: &str =
    "https://github.com/paketo-buildpacks/cpython/archive/refs/heads/main.tar.gz";
pub const REPO_OWNER: &str = "matejvasek";
pub const REPO_NAME: &str = "cpython-dist";
pub const RELEASE_TAG: &str = "v0.0.0";
pub const IMAGE_TAG: &str = "compilation";

/// Every docker-shaped call the orchestrator makes, recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    BuildImage {
        context: Utf8PathBuf,
        dockerfile: Utf8PathBuf,
        tag: String,
    },
    Compile {
        tag: String,
        host_output_dir: Utf8PathBuf,
        container_output_dir: String,
        version: String,
        target: String,
    },
}

impl Invocation {
    pub fn is_build_image(&self) -> bool {
        matches!(self, Invocation::BuildImage { .. })
    }

    pub fn compiled_version(&self) -> Option<&str> {
        match self {
            Invocation::Compile { version, .. } => Some(version),
            Invocation::BuildImage { .. } => None,
        }
    }
}

/// A [`ContainerRuntime`] that only takes notes
#[derive(Default)]
pub struct RecordingRuntime {
    invocations: Mutex<Vec<Invocation>>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Invocation> {
        std::mem::take(&mut self.invocations.lock().unwrap())
    }
}

impl ContainerRuntime for RecordingRuntime {
    fn build_image(&self, context: &Utf8Path, dockerfile: &Utf8Path, tag: &str) -> Result<()> {
        self.invocations
            .lock()
            .unwrap()
            .push(Invocation::BuildImage {
                context: context.to_owned(),
                dockerfile: dockerfile.to_owned(),
                tag: tag.to_owned(),
            });
        Ok(())
    }

    fn compile_version(
        &self,
        tag: &str,
        host_output_dir: &Utf8Path,
        container_output_dir: &str,
        version: &str,
        target: &str,
    ) -> Result<()> {
        self.invocations.lock().unwrap().push(Invocation::Compile {
            tag: tag.to_owned(),
            host_output_dir: host_output_dir.to_owned(),
            container_output_dir: container_output_dir.to_owned(),
            version: version.to_owned(),
            target: target.to_owned(),
        });
        Ok(())
    }
}

pub fn mock_config() -> Config {
    Config {
        source_url: SOURCE_URL.to_owned(),
        owner: REPO_OWNER.to_owned(),
        repo: REPO_NAME.to_owned(),
        release_tag: RELEASE_TAG.to_owned(),
        image_tag: IMAGE_TAG.to_owned(),
        context_dir: "dependency/actions/compile".into(),
        dockerfile: "jammy.Dockerfile".into(),
        target: "jammy".to_owned(),
        arch: "arm64".to_owned(),
        container_output_dir: "/home".to_owned(),
        upload_checksums: true,
    }
}

pub fn mock_release(asset_names: &[&str]) -> Release {
    Release {
        id: 1,
        tag_name: RELEASE_TAG.to_owned(),
        assets: asset_names
            .iter()
            .map(|name| ReleaseAsset {
                name: (*name).to_owned(),
            })
            .collect(),
    }
}
