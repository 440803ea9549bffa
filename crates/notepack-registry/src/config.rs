//! Registry endpoint configuration.

use serde::Deserialize;

/// Base URLs for package metadata and content fetches.
///
/// `cdn_base` serves `GET <cdn_base>/<pkg>[@<version>]/package.json` and
/// module bodies; `registry_base` serves `GET <registry_base>/<pkg>` with a
/// `versions` object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub cdn_base: String,
    pub registry_base: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cdn_base: "https://unpkg.com".to_string(),
            registry_base: "https://registry.npmjs.org".to_string(),
        }
    }
}

impl RegistryConfig {
    /// URL of a package's metadata on the CDN, optionally pinned.
    pub fn package_json_url(&self, package: &str, version: Option<&str>) -> String {
        match version {
            Some(version) => format!("{}/{}@{}/package.json", self.cdn_base, package, version),
            None => format!("{}/{}/package.json", self.cdn_base, package),
        }
    }

    /// URL of a package's full registry metadata.
    pub fn registry_url(&self, package: &str) -> String {
        format!("{}/{}", self.registry_base, package)
    }
}
