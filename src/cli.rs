//! All the clap stuff for parsing/documenting the cli

use camino::Utf8PathBuf;
use clap::{
    builder::{PossibleValuesParser, TypedValueParser},
    Parser,
};
use cpython_dist::config::Config;
use tracing::level_filters::LevelFilter;

/// Compile missing CPython versions for the cpython buildpack and publish
/// them as release assets.
///
/// One run is one sync: download the buildpack source, diff the versions it
/// declares against what the distribution release already carries, compile
/// the difference in the buildpack's own compilation image, and upload the
/// results. A release that's already complete means a run that does nothing.
///
/// Authentication comes from the GITHUB_TOKEN environment variable.
#[derive(Parser, Clone, Debug)]
#[clap(version, about, long_about = None)]
pub struct Cli {
    /// How verbose logging should be (log level)
    #[clap(long, short)]
    #[clap(default_value_t = LevelFilter::WARN)]
    #[clap(value_parser = PossibleValuesParser::new(["off", "error", "warn", "info", "debug", "trace"]).map(|s| s.parse::<LevelFilter>().expect("possible values are valid")))]
    pub verbose: LevelFilter,

    /// Url of the buildpack source archive (a gzipped tarball)
    #[clap(long)]
    #[clap(
        default_value = "https://github.com/paketo-buildpacks/cpython/archive/refs/heads/main.tar.gz"
    )]
    pub source_url: String,

    /// Owner of the distribution repository the compiled versions live in
    #[clap(long, default_value = "matejvasek")]
    pub owner: String,

    /// Name of the distribution repository
    #[clap(long, default_value = "cpython-dist")]
    pub repo: String,

    /// Tag of the release the compiled versions are published to
    #[clap(long, default_value = "v0.0.0")]
    pub tag: String,

    /// Local tag for the compilation image we build
    #[clap(long, default_value = "compilation")]
    pub image_tag: String,

    /// Docker build context, relative to the extracted source root
    #[clap(long, default_value = "dependency/actions/compile")]
    pub context_dir: Utf8PathBuf,

    /// Dockerfile for the compilation image, relative to the build context
    #[clap(long, default_value = "jammy.Dockerfile")]
    pub dockerfile: Utf8PathBuf,

    /// Platform label handed to the compilation image
    #[clap(long, default_value = "jammy")]
    pub target: String,

    /// Architecture marker used in published asset names
    #[clap(long, default_value = "arm64")]
    pub arch: String,

    /// Where the compilation image writes artifacts, inside the container
    #[clap(long, default_value = "/home")]
    pub container_output_dir: String,

    /// Don't upload .tgz.checksum companions, archives only
    #[clap(long)]
    pub skip_checksums: bool,
}

impl Cli {
    /// Convert the parsed cli into the library's config
    pub fn to_config(&self) -> Config {
        Config {
            source_url: self.source_url.clone(),
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            release_tag: self.tag.clone(),
            image_tag: self.image_tag.clone(),
            context_dir: self.context_dir.clone(),
            dockerfile: self.dockerfile.clone(),
            target: self.target.clone(),
            arch: self.arch.clone(),
            container_output_dir: self.container_output_dir.clone(),
            upload_checksums: !self.skip_checksums,
        }
    }
}
