//! the module manifest written by `terraform init`
//!
//! Terraform materializes non-local module sources into
//! `.terraform/modules/` and records where each call ended up in
//! `modules.json`. Records are keyed by the dot-joined call names from the
//! tree root (`consul.consul_clients`). This crate only ever reads the
//! manifest; a missing entry means the tree was not initialized for that
//! call.

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::PathBuf;

/// Location of the manifest, relative to the directory `terraform init` ran in.
pub(crate) const MANIFEST_PATH: &str = ".terraform/modules/modules.json";

#[derive(Debug, Default)]
pub struct ModuleManifest {
    records: IndexMap<String, ModuleRecord>,
}

/// One materialized module.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleRecord {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Version", default)]
    pub version: Option<String>,
    /// Directory the source was materialized into. Trusted verbatim; the
    /// loader does not re-check that it exists.
    #[serde(rename = "Dir")]
    pub dir: PathBuf,
}

#[derive(Deserialize)]
struct ManifestFile {
    #[serde(rename = "Modules")]
    modules: Vec<ModuleRecord>,
}

impl ModuleManifest {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let file: ManifestFile = serde_json::from_str(raw)?;
        let records = file
            .modules
            .into_iter()
            .map(|record| (record.key.clone(), record))
            .collect();
        Ok(Self { records })
    }

    pub fn get(&self, key: &str) -> Option<&ModuleRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    const RAW: &str = r#"{"Modules":[
        {"Key":"","Source":"","Dir":"."},
        {"Key":"consul","Source":"registry.terraform.io/hashicorp/consul/aws","Version":"0.11.0","Dir":".terraform/modules/consul"},
        {"Key":"consul.consul_servers","Source":"./modules/consul-cluster","Dir":".terraform/modules/consul/modules/consul-cluster"}
    ]}"#;

    #[test]
    fn resolves_dotted_keys() {
        let manifest = ModuleManifest::parse(RAW).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(
            manifest.get("consul").unwrap().dir,
            PathBuf::from(".terraform/modules/consul")
        );
        assert_eq!(
            manifest.get("consul.consul_servers").unwrap().version,
            None
        );
        assert!(manifest.get("consul.missing").is_none());
    }

    #[test]
    fn rejects_malformed_manifests() {
        assert!(ModuleManifest::parse("{\"Modules\":{}}").is_err());
    }
}
