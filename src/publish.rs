//! Renaming, classifying, and uploading build artifacts
//!
//! The compilation image names its output for the machine it ran on, so the
//! filenames need fixing up before upload: the `x64` architecture marker
//! becomes whatever we actually built for, and the embedded 8-hex-digit
//! source hash gets dropped. Both rewrites are pure and idempotent.

use axoasset::LocalAsset;
use camino::{Utf8Path, Utf8PathBuf};
use lazy_static::lazy_static;
use regex::Regex;
use tokio::runtime::Handle;

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::errors::{CpythonDistError, Result};
use crate::github::{GithubClient, Release};

/// Suffix of the compiled archives the build step produces
pub const ARCHIVE_SUFFIX: &str = ".tgz";
/// Suffix of the checksum companions next to each archive
pub const CHECKSUM_SUFFIX: &str = ".tgz.checksum";

lazy_static! {
    // the `_`-delimited arch marker the compilation image stamps into names
    static ref ARCH_MARKER_RE: Regex =
        Regex::new(r"_x64(?P<sep>[_.])").expect("arch marker pattern didn't compile");
    // an `_`-prefixed run of exactly 8 hex digits, right before the extension
    static ref HASH_SEGMENT_RE: Regex =
        Regex::new(r"_[0-9a-f]{8}(?P<tail>\.|$)").expect("hash segment pattern didn't compile");
}

/// The name an artifact file should be uploaded under.
///
/// Swaps the `x64` architecture marker for `arch` and strips the embedded
/// 8-hex-digit hash segment. Applying this twice yields the same result as
/// applying it once.
pub fn sanitize_asset_name(name: &str, arch: &str) -> String {
    let renamed = ARCH_MARKER_RE.replace_all(name, format!("_{arch}${{sep}}"));
    HASH_SEGMENT_RE.replace_all(&renamed, "${tail}").into_owned()
}

/// The media type an asset uploads with, judged by its suffix.
pub fn media_type(name: &str) -> &'static str {
    if name.ends_with(CHECKSUM_SUFFIX) {
        "text/plain"
    } else if name.ends_with(ARCHIVE_SUFFIX) {
        "application/gzip"
    } else {
        "application/octet-stream"
    }
}

fn is_artifact(name: &str, upload_checksums: bool) -> bool {
    name.ends_with(ARCHIVE_SUFFIX) || (upload_checksums && name.ends_with(CHECKSUM_SUFFIX))
}

/// Every artifact file under `dir`, recursively, in a stable order.
pub fn collect_artifacts(dir: &Utf8Path, upload_checksums: bool) -> Result<Vec<Utf8PathBuf>> {
    let mut found = Vec::new();
    walk_into(dir, upload_checksums, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk_into(dir: &Utf8Path, upload_checksums: bool, found: &mut Vec<Utf8PathBuf>) -> Result<()> {
    let walk_err = |details: std::io::Error| CpythonDistError::WalkOutputDir {
        dir: dir.to_owned(),
        details,
    };

    for entry in dir.read_dir_utf8().map_err(walk_err)? {
        let entry = entry.map_err(walk_err)?;
        let file_type = entry.file_type().map_err(walk_err)?;
        if file_type.is_dir() {
            walk_into(entry.path(), upload_checksums, found)?;
        } else if file_type.is_file() && is_artifact(entry.file_name(), upload_checksums) {
            found.push(entry.path().to_owned());
        }
    }
    Ok(())
}

/// Walk `out_dir` and upload every artifact to `release`, one at a time.
///
/// Uploads aren't idempotent: re-running against a release that already has
/// an asset by the same name is a server-side error, which aborts the walk
/// like any other failure.
pub fn publish_artifacts(
    cfg: &Config,
    cancel: &CancelToken,
    handle: &Handle,
    github: &GithubClient,
    release: &Release,
    out_dir: &Utf8Path,
) -> Result<()> {
    let artifacts = collect_artifacts(out_dir, cfg.upload_checksums)?;
    for path in &artifacts {
        cancel.check()?;
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let upload_name = sanitize_asset_name(file_name, &cfg.arch);
        eprintln!("uploading: {path} as {upload_name}");
        let data = LocalAsset::load_bytes(path)?;
        handle.block_on(github.upload_release_asset(
            &cfg.owner,
            &cfg.repo,
            release.id,
            &upload_name,
            media_type(&upload_name),
            data,
        ))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use temp_dir::TempDir;

    #[test]
    fn sanitize_swaps_arch_and_strips_hash() {
        assert_eq!(
            sanitize_asset_name("python_3.10.9_linux_x64_a1b2c3d4.tgz", "arm64"),
            "python_3.10.9_linux_arm64.tgz"
        );
    }

    #[test]
    fn sanitize_handles_checksum_companions() {
        assert_eq!(
            sanitize_asset_name("python_3.10.9_linux_x64_a1b2c3d4.tgz.checksum", "arm64"),
            "python_3.10.9_linux_arm64.tgz.checksum"
        );
    }

    #[test]
    fn sanitize_keeps_platform_labels_between_arch_and_hash() {
        assert_eq!(
            sanitize_asset_name("python_3.10.9_linux_x64_jammy_f2bccdb9.tgz", "arm64"),
            "python_3.10.9_linux_arm64_jammy.tgz"
        );
    }

    #[test]
    fn sanitize_is_idempotent() {
        let names = [
            "python_3.10.9_linux_x64_a1b2c3d4.tgz",
            "python_3.10.9_linux_arm64.tgz",
            "python_3.10.9_linux_x64_jammy_f2bccdb9.tgz.checksum",
            "not-an-artifact.txt",
        ];
        for name in names {
            let once = sanitize_asset_name(name, "arm64");
            let twice = sanitize_asset_name(&once, "arm64");
            assert_eq!(once, twice, "sanitizing {name} twice diverged");
        }
    }

    #[test]
    fn hash_stripping_wants_exactly_eight_hex_digits() {
        // nine digits: not a hash segment
        assert_eq!(
            sanitize_asset_name("python_3.10.9_linux_arm64_a1b2c3d4e.tgz", "arm64"),
            "python_3.10.9_linux_arm64_a1b2c3d4e.tgz"
        );
        // seven digits: not a hash segment either
        assert_eq!(
            sanitize_asset_name("python_3.10.9_linux_arm64_a1b2c3d.tgz", "arm64"),
            "python_3.10.9_linux_arm64_a1b2c3d.tgz"
        );
    }

    #[test]
    fn every_name_classifies_to_exactly_one_media_type() {
        assert_eq!(media_type("python_3.10.9_linux_arm64.tgz"), "application/gzip");
        assert_eq!(
            media_type("python_3.10.9_linux_arm64.tgz.checksum"),
            "text/plain"
        );
        assert_eq!(media_type("build.log"), "application/octet-stream");
        assert_eq!(media_type(""), "application/octet-stream");
    }

    #[test]
    fn collect_finds_nested_artifacts_and_honors_checksum_policy() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_owned()).unwrap();
        std::fs::create_dir_all(root.join("nested")).unwrap();
        std::fs::write(root.join("python_3.12.2_linux_x64_a1b2c3d4.tgz"), b"x").unwrap();
        std::fs::write(
            root.join("python_3.12.2_linux_x64_a1b2c3d4.tgz.checksum"),
            b"x",
        )
        .unwrap();
        std::fs::write(root.join("nested/python_3.11.4_linux_x64_deadbeef.tgz"), b"x").unwrap();
        std::fs::write(root.join("build.log"), b"x").unwrap();

        let with_checksums = collect_artifacts(&root, true).unwrap();
        assert_eq!(with_checksums.len(), 3);

        let archives_only = collect_artifacts(&root, false).unwrap();
        assert_eq!(archives_only.len(), 2);
        assert!(archives_only
            .iter()
            .all(|path| path.as_str().ends_with(ARCHIVE_SUFFIX)));
    }
}
