//! Fetching and unpacking the buildpack source
//!
//! The source archive is a `<repo>-<branch>/...` style tarball, so every entry
//! gets its first path component stripped on the way out, leaving
//! buildpack.toml and friends at the root of the unpack dir.

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use temp_dir::TempDir;
use tokio::runtime::Handle;

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::errors::{CpythonDistError, Result};

/// An unpacked copy of the buildpack source, rooted in a scratch dir.
///
/// The scratch dir lives exactly as long as this value; dropping it (on
/// success or failure) removes the tree. The original tooling this replaces
/// left its temp dirs behind -- scoped cleanup closes that leak.
pub struct SourceTree {
    _tmp: TempDir,
    root: Utf8PathBuf,
}

impl SourceTree {
    /// Where the stripped source contents live
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

/// Download the buildpack source archive and unpack it into a scratch dir.
pub fn fetch_buildpack_source(
    cfg: &Config,
    cancel: &CancelToken,
    handle: &Handle,
    client: &axoasset::AxoClient,
) -> Result<SourceTree> {
    cancel.check()?;
    eprintln!("downloading buildpack source: {}", cfg.source_url);

    let response = handle
        .block_on(client.get(&cfg.source_url))
        .map_err(|details| CpythonDistError::FetchSource {
            url: cfg.source_url.clone(),
            details,
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(CpythonDistError::FetchSourceStatus {
            url: cfg.source_url.clone(),
            status,
        });
    }
    let bytes = handle
        .block_on(response.bytes())
        .map_err(|details| CpythonDistError::FetchSourceBody {
            url: cfg.source_url.clone(),
            details,
        })?;

    let tmp = TempDir::new().map_err(|details| CpythonDistError::CreateTempDir { details })?;
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_owned())
        .expect("temp dir made non-utf8 path!?");

    extract_stripped(&bytes, &root)?;

    Ok(SourceTree { _tmp: tmp, root })
}

/// Gunzip+untar `bytes` into `dest`, dropping the first path component of
/// every entry (the archive's wrapper directory itself unpacks to nothing).
fn extract_stripped(bytes: &[u8], dest: &Utf8Path) -> Result<()> {
    let extract_err = |details: std::io::Error| CpythonDistError::ExtractSource {
        dest: dest.to_owned(),
        details,
    };

    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    for entry in archive.entries().map_err(extract_err)? {
        let mut entry = entry.map_err(extract_err)?;
        let stripped: std::path::PathBuf = entry
            .path()
            .map_err(extract_err)?
            .components()
            .skip(1)
            .collect();
        if stripped.as_os_str().is_empty() {
            continue;
        }
        let target = dest.as_std_path().join(stripped);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(extract_err)?;
        }
        entry.unpack(&target).map_err(extract_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tarball_of(entries: &[(&str, &str)]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, contents.as_bytes())
                .unwrap();
        }
        let encoder = builder.into_inner().unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn wrapper_directory_is_stripped() {
        let tarball = tarball_of(&[
            ("cpython-main/buildpack.toml", "[metadata]\n"),
            ("cpython-main/dependency/actions/compile/entrypoint", "#!/bin/sh\n"),
        ]);
        let tmp = TempDir::new().unwrap();
        let dest = Utf8PathBuf::from_path_buf(tmp.path().to_owned()).unwrap();

        extract_stripped(&tarball, &dest).unwrap();

        assert!(dest.join("buildpack.toml").exists());
        assert!(dest.join("dependency/actions/compile/entrypoint").exists());
        assert!(!dest.join("cpython-main").exists());
    }

    #[test]
    fn garbage_bytes_are_an_extraction_error() {
        let tmp = TempDir::new().unwrap();
        let dest = Utf8PathBuf::from_path_buf(tmp.path().to_owned()).unwrap();

        let result = extract_stripped(b"this is not a tarball", &dest);
        assert!(matches!(
            result,
            Err(CpythonDistError::ExtractSource { .. })
        ));
    }

    #[test]
    fn gzip_without_tar_inside_is_an_extraction_error() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"just some gzipped text").unwrap();
        let bytes = encoder.finish().unwrap();

        let tmp = TempDir::new().unwrap();
        let dest = Utf8PathBuf::from_path_buf(tmp.path().to_owned()).unwrap();

        let result = extract_stripped(&bytes, &dest);
        assert!(matches!(
            result,
            Err(CpythonDistError::ExtractSource { .. })
        ));
    }
}
