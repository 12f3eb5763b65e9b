use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Error;
use crate::observer::AcquireProgress;

/// A package as seen by the cache engine's index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    #[serde(default)]
    pub arch: String,
    pub installed: Option<String>,
    pub candidate: Option<String>,
    /// Upgradability as decided by the engine.
    #[serde(default)]
    pub upgradable: bool,
}

/// An installed package with a newer candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradablePackage {
    pub name: String,
    pub arch: String,
    pub installed_version: String,
    pub candidate_version: String,
}

impl fmt::Display for UpgradablePackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} -> {})",
            self.name, self.installed_version, self.candidate_version
        )
    }
}

/// The package-cache engine driven by a refresh.
pub trait CacheEngine {
    /// Refresh the index files, reporting through `progress`.
    fn update(&mut self, progress: &mut dyn AcquireProgress) -> Result<(), Error>;

    /// Re-read the on-disk index. Required before `packages` reflects a refresh.
    fn reload(&mut self) -> Result<(), Error>;

    fn packages(&self) -> Vec<PackageInfo>;
}

/// Packages flagged upgradable that carry both versions, in index order.
pub fn upgradable_packages(packages: &[PackageInfo]) -> Vec<UpgradablePackage> {
    packages
        .iter()
        .filter(|p| p.upgradable)
        .filter_map(|p| match (&p.installed, &p.candidate) {
            (Some(installed), Some(candidate)) => Some(UpgradablePackage {
                name: p.name.clone(),
                arch: p.arch.clone(),
                installed_version: installed.clone(),
                candidate_version: candidate.clone(),
            }),
            _ => {
                tracing::debug!(package = %p.name, "upgradable package without versions skipped");
                None
            }
        })
        .collect()
}
