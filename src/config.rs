//! Runtime configuration for a compile-and-publish run
//!
//! Everything here is computed once at startup (from the cli) and then passed
//! by reference into every component. Nothing reaches back into the process
//! environment after that, with one deliberate exception: the GitHub
//! credential, which is read exactly once while constructing the api client
//! and never stored anywhere printable (see [`crate::github`]).

use camino::{Utf8Path, Utf8PathBuf};

/// All the knobs for one run
#[derive(Debug, Clone)]
pub struct Config {
    /// url of the buildpack source archive (a gzipped tarball)
    pub source_url: String,
    /// owner of the distribution repository the compiled versions live in
    pub owner: String,
    /// name of the distribution repository
    pub repo: String,
    /// tag of the release that holds the compiled versions as assets
    pub release_tag: String,
    /// local tag for the compilation image we build
    pub image_tag: String,
    /// docker build context, relative to the extracted source root
    pub context_dir: Utf8PathBuf,
    /// dockerfile for the compilation image, relative to the build context
    pub dockerfile: Utf8PathBuf,
    /// platform label the compilation image builds for (e.g. "jammy")
    pub target: String,
    /// architecture marker used in published asset names (e.g. "arm64")
    pub arch: String,
    /// where the compilation image expects to write artifacts, inside the container
    pub container_output_dir: String,
    /// whether .tgz.checksum companions get uploaded alongside the archives
    pub upload_checksums: bool,
}

impl Config {
    /// The docker build context inside the extracted source
    pub fn compile_context(&self, src_root: &Utf8Path) -> Utf8PathBuf {
        src_root.join(&self.context_dir)
    }

    /// The dockerfile used to build the compilation image
    pub fn compile_dockerfile(&self, src_root: &Utf8Path) -> Utf8PathBuf {
        self.compile_context(src_root).join(&self.dockerfile)
    }
}
