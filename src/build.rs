//! Building the compilation image and running it once per missing version
//!
//! The orchestrator knows nothing about how CPython actually gets compiled;
//! the compilation image owns the toolchain. Our whole job is deciding which
//! versions to hand it and where its output lands.

use axoprocess::Cmd;
use camino::Utf8Path;

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::errors::Result;

/// The container operations the orchestrator needs.
///
/// Split out as a trait so tests can record invocations instead of spawning
/// real containers.
pub trait ContainerRuntime {
    /// Build the compilation image from `context`, tagging it `tag`
    fn build_image(&self, context: &Utf8Path, dockerfile: &Utf8Path, tag: &str) -> Result<()>;

    /// Run the image once to compile `version`, with `host_output_dir`
    /// mounted at `container_output_dir`
    fn compile_version(
        &self,
        tag: &str,
        host_output_dir: &Utf8Path,
        container_output_dir: &str,
        version: &str,
        target: &str,
    ) -> Result<()>;
}

/// The real thing: shells out to `docker`, streaming its output
pub struct Docker;

impl ContainerRuntime for Docker {
    fn build_image(&self, context: &Utf8Path, dockerfile: &Utf8Path, tag: &str) -> Result<()> {
        Cmd::new("docker", "build the compilation image")
            .arg("build")
            .arg(context)
            .arg("-t")
            .arg(tag)
            .arg("-f")
            .arg(dockerfile)
            .env("BUILDKIT_PROGRESS", "plain")
            .run()?;
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
        Cmd::new("docker", format!("compile cpython {version}"))
            .arg("run")
            .arg(format!("-v{host_output_dir}:{container_output_dir}"))
            .arg(tag)
            .arg("--version")
            .arg(version)
            .arg("--outputDir")
            .arg(container_output_dir)
            .arg("--target")
            .arg(target)
            .run()?;
        Ok(())
    }
}

/// Build the compilation image and compile every version in `versions`,
/// serially, all into the shared `out_dir`.
///
/// An empty `versions` is a no-op: the image build is skipped too, there'd be
/// nothing to run it for. Any failed invocation aborts the whole batch; the
/// cancel token is consulted before each one.
pub fn compile_versions<R: ContainerRuntime>(
    runtime: &R,
    cfg: &Config,
    cancel: &CancelToken,
    src_root: &Utf8Path,
    out_dir: &Utf8Path,
    versions: &[String],
) -> Result<()> {
    if versions.is_empty() {
        return Ok(());
    }

    cancel.check()?;
    eprintln!("building the compilation image");
    runtime.build_image(
        &cfg.compile_context(src_root),
        &cfg.compile_dockerfile(src_root),
        &cfg.image_tag,
    )?;

    for version in versions {
        cancel.check()?;
        eprintln!("compiling cpython {version}");
        runtime.compile_version(
            &cfg.image_tag,
            out_dir,
            &cfg.container_output_dir,
            version,
            &cfg.target,
        )?;
    }

    Ok(())
}
