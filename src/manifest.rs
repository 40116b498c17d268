//! Reading the set of CPython versions the buildpack declares
//!
//! The buildpack's `buildpack.toml` carries a `metadata.dependencies` table
//! array; every entry's `version` field is a build target. Entries carry
//! plenty of other fields (id, stacks, checksums, ...) that we don't care
//! about and serde happily ignores.

use std::collections::BTreeSet;

use axoasset::SourceFile;
use camino::Utf8Path;
use serde::Deserialize;

use crate::errors::{CpythonDistError, Result};

/// Filename of the buildpack's manifest, at the source root
pub const BUILDPACK_MANIFEST: &str = "buildpack.toml";

/// The slice of buildpack.toml we decode
#[derive(Deserialize, Debug, Clone)]
pub struct BuildpackManifest {
    /// the buildpack's metadata table
    pub metadata: BuildpackMetadata,
}

/// `[metadata]` of a buildpack.toml
#[derive(Deserialize, Debug, Clone)]
pub struct BuildpackMetadata {
    /// the dependencies the buildpack offers; absent means none
    #[serde(default)]
    pub dependencies: Vec<BuildpackDependency>,
}

/// One `[[metadata.dependencies]]` entry
#[derive(Deserialize, Debug, Clone)]
pub struct BuildpackDependency {
    /// the dependency's version, our build target
    pub version: String,
}

/// The distinct versions declared by the buildpack at `src_root`.
///
/// Duplicate versions across entries (same version for several stacks, say)
/// collapse into one set member.
pub fn declared_versions(src_root: &Utf8Path) -> Result<BTreeSet<String>> {
    let manifest_path = src_root.join(BUILDPACK_MANIFEST);
    if !manifest_path.exists() {
        return Err(CpythonDistError::MissingBuildpackManifest {
            path: manifest_path,
        });
    }

    let manifest: BuildpackManifest = SourceFile::load_local(&manifest_path)?.deserialize_toml()?;

    Ok(manifest
        .metadata
        .dependencies
        .into_iter()
        .map(|dependency| dependency.version)
        .collect())
}
