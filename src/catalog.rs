//! Operation catalog
//!
//! Read-only lookup from an application key to the metadata the bridge needs.
//! The orchestrator only ever calls [`OperationCatalog::lookup`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use strum::{Display, EnumString};

/// How a package is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InstallMethod {
    #[default]
    Apt,
    Snap,
    Flatpak,
}

/// Descriptive metadata for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    pub display_name: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub method: InstallMethod,
    /// Repository or remote the package comes from (e.g. `flathub`)
    #[serde(default)]
    pub source: String,
    /// Package name for the package manager; the catalog key when empty
    #[serde(default)]
    pub package: String,
}

impl CatalogEntry {
    pub fn new(display_name: impl Into<String>, method: InstallMethod) -> Self {
        Self {
            display_name: display_name.into(),
            group: String::new(),
            description: String::new(),
            method,
            source: String::new(),
            package: String::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    /// Package name to hand to the package manager
    pub fn package_name<'a>(&'a self, key: &'a str) -> &'a str {
        if self.package.is_empty() {
            key
        } else {
            &self.package
        }
    }
}

/// Lookup table from application key to metadata.
pub trait OperationCatalog: Send + Sync {
    fn lookup(&self, key: &str) -> Option<CatalogEntry>;
}

/// In-memory catalog, loadable from a JSON object of `key -> entry`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: CatalogEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn with_entry(mut self, key: impl Into<String>, entry: CatalogEntry) -> Self {
        self.insert(key, entry);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CatalogEntry)> {
        self.entries.iter()
    }

    /// Load a catalog from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read catalog from {:?}", path.as_ref()))?;

        let catalog: Self =
            serde_json::from_str(&content).context("Failed to parse catalog JSON")?;
        catalog.validate()?;

        Ok(catalog)
    }

    /// Save the catalog to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize catalog to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write catalog to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Every entry needs a non-blank key and display name; flatpak entries need a remote
    pub fn validate(&self) -> Result<()> {
        for (key, entry) in &self.entries {
            if key.trim().is_empty() {
                anyhow::bail!("Catalog contains an entry with an empty key");
            }
            if entry.display_name.trim().is_empty() {
                anyhow::bail!("Catalog entry '{}' has no display name", key);
            }
            if entry.method == InstallMethod::Flatpak && entry.source.trim().is_empty() {
                anyhow::bail!("Flatpak entry '{}' must name a source remote", key);
            }
        }
        Ok(())
    }

    /// Small catalog used when no catalog file is given
    pub fn builtin() -> Self {
        Self::new()
            .with_entry(
                "firefox",
                CatalogEntry::new("Firefox", InstallMethod::Apt)
                    .with_group("Internet")
                    .with_description("Web browser"),
            )
            .with_entry(
                "vlc",
                CatalogEntry::new("VLC", InstallMethod::Apt)
                    .with_group("Multimedia")
                    .with_description("Media player"),
            )
            .with_entry(
                "git",
                CatalogEntry::new("Git", InstallMethod::Apt)
                    .with_group("Development")
                    .with_description("Distributed version control"),
            )
            .with_entry(
                "curl",
                CatalogEntry::new("curl", InstallMethod::Apt)
                    .with_group("Development")
                    .with_description("URL transfer tool"),
            )
            .with_entry(
                "gimp",
                CatalogEntry::new("GIMP", InstallMethod::Flatpak)
                    .with_group("Graphics")
                    .with_description("Image editor")
                    .with_source("flathub")
                    .with_package("org.gimp.GIMP"),
            )
            .with_entry(
                "code",
                CatalogEntry::new("Visual Studio Code", InstallMethod::Snap)
                    .with_group("Development")
                    .with_description("Code editor"),
            )
    }
}

impl OperationCatalog for StaticCatalog {
    fn lookup(&self, key: &str) -> Option<CatalogEntry> {
        self.entries.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_and_unknown() {
        let catalog = StaticCatalog::builtin();
        let entry = catalog.lookup("firefox").expect("firefox is builtin");
        assert_eq!(entry.display_name, "Firefox");
        assert_eq!(entry.method, InstallMethod::Apt);
        assert!(catalog.lookup("doesnotexist").is_none());
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        assert!(StaticCatalog::builtin().validate().is_ok());
    }

    #[test]
    fn test_package_name_falls_back_to_key() {
        let catalog = StaticCatalog::builtin();
        let vlc = catalog.lookup("vlc").expect("vlc");
        assert_eq!(vlc.package_name("vlc"), "vlc");
        let gimp = catalog.lookup("gimp").expect("gimp");
        assert_eq!(gimp.package_name("gimp"), "org.gimp.GIMP");
    }

    #[test]
    fn test_flatpak_without_source_is_invalid() {
        let catalog = StaticCatalog::new()
            .with_entry("gimp", CatalogEntry::new("GIMP", InstallMethod::Flatpak));
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_parse_minimal_entry() {
        let json = r#"{ "htop": { "display_name": "htop" } }"#;
        let catalog: StaticCatalog = serde_json::from_str(json).expect("parse");
        let entry = catalog.lookup("htop").expect("htop");
        assert_eq!(entry.method, InstallMethod::Apt);
        assert!(entry.source.is_empty());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let json = r#"{ "htop": { "display_name": "htop", "colour": "red" } }"#;
        assert!(serde_json::from_str::<StaticCatalog>(json).is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("catalog.json");
        let catalog = StaticCatalog::builtin();
        catalog.save_to_file(&path).expect("save");
        let loaded = StaticCatalog::load_from_file(&path).expect("load");
        assert_eq!(loaded, catalog);
    }
}
