use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    paths: HashMap<String, PathEntry>,
}

/// A manifest entry: either the relative file name or `{ "path": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PathEntry {
    File(String),
    Detailed { path: String },
}

impl PathEntry {
    fn relative(&self) -> &str {
        match self {
            PathEntry::File(rel) | PathEntry::Detailed { path: rel } => rel,
        }
    }

    fn location(&self) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(self.relative())
    }

    fn read(&self) -> Result<String> {
        let location = self.location();
        fs::read_to_string(&location)
            .with_context(|| format!("reading path fixture {}", location.display()))
    }
}

fn entry(name: &str) -> Result<&'static PathEntry> {
    MANIFEST.paths.get(name).ok_or_else(|| {
        anyhow!(
            "no path fixture named '{name}' (known: {})",
            paths::keys().join(", ")
        )
    })
}

/// Saved keyframe paths (`fixtures/paths/*.json`).
pub mod paths {
    use super::*;

    /// Fixture names, sorted.
    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.paths.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Raw JSON text of a saved path.
    pub fn json(name: &str) -> Result<String> {
        entry(name)?.read()
    }

    /// Deserialize a saved path into `T` (strict serde, unlike the engine's lenient import).
    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let text = json(name)?;
        serde_json::from_str(&text).with_context(|| format!("parsing path fixture '{name}'"))
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(entry(name)?.location())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_manifest_entry_resolves() {
        for key in paths::keys() {
            let text = paths::json(&key).expect("fixture readable");
            let _: serde_json::Value = serde_json::from_str(&text).expect("fixture is JSON");
        }
    }

    #[test]
    fn unknown_fixture_lists_known_names() {
        let err = paths::json("does-not-exist").unwrap_err().to_string();
        assert!(err.contains("three-point"), "{err}");
        assert!(paths::path("three-point").unwrap().ends_with("paths/three_point.json"));
    }
}
