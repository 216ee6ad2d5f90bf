//! Gateway settings.
//!
//! Loaded once at process start from a JSON file. Every field has a default,
//! so an empty object is a valid settings file.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ApiError;
use crate::prefixes::{PrefixRegistry, ROOT_CONTEXT};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8890/sparql";
pub const DEFAULT_RULESET: &str = "http://semantica.globo.com/ruleset";

/// Graphs that belong to the triplestore itself rather than to the knowledge base.
pub const DEFAULT_IGNORED_GRAPH_PREFIXES: &[&str] = &[
    "http://www.openlinksw.com/",
    "http://localhost:8890/",
    "http://www.w3.org/",
    "http://www.w3.org/2002/07/owl",
    "http://purl.org/",
    "http://xmlns.com/",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SPARQL endpoint URL.
    pub endpoint: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Inference ruleset activated by `DEFINE input:inference`.
    pub ruleset: String,
    /// Namespace under which unregistered contexts are created.
    pub root_context: String,
    pub default_per_page: u64,
    pub max_per_page: u64,
    /// Timeout for triplestore requests, in seconds.
    pub timeout_secs: u64,
    /// Extra prefixes, merged over the built-in table.
    pub prefixes: BTreeMap<String, String>,
    pub ignored_graph_prefixes: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user: None,
            password: None,
            ruleset: DEFAULT_RULESET.to_string(),
            root_context: ROOT_CONTEXT.to_string(),
            default_per_page: 10,
            max_per_page: 100,
            timeout_secs: 10,
            prefixes: BTreeMap::new(),
            ignored_graph_prefixes: DEFAULT_IGNORED_GRAPH_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the file is missing, unreadable or not
    /// valid settings JSON.
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        if !path.exists() {
            return Err(ApiError::Config {
                path: path.to_path_buf(),
                message: "file not found".to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ApiError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::from_json(&content).map_err(|e| ApiError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Built-in prefixes plus [`Settings::prefixes`].
    pub fn prefix_registry(&self) -> PrefixRegistry {
        PrefixRegistry::with_prefixes(self.prefixes.clone())
    }

    pub fn is_ignored_graph(&self, graph: &str) -> bool {
        self.ignored_graph_prefixes
            .iter()
            .any(|prefix| graph.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_object_uses_defaults() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.default_per_page, 10);
        assert_eq!(settings.root_context, ROOT_CONTEXT);
        assert!(settings.is_ignored_graph("http://www.openlinksw.com/schemas/virtrdf#"));
        assert!(!settings.is_ignored_graph("http://semantica.globo.com/upper/"));
    }

    #[test]
    fn load_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"endpoint": "http://store:8890/sparql", "default_per_page": 5,
                "prefixes": {{"person": "http://semantica.globo.com/person/"}}}}"#
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.endpoint, "http://store:8890/sparql");
        assert_eq!(settings.default_per_page, 5);
        assert_eq!(settings.max_per_page, 100);
        let registry = settings.prefix_registry();
        assert_eq!(
            registry.namespace("person"),
            Some("http://semantica.globo.com/person/")
        );
        assert!(registry.namespace("rdfs").is_some());
    }

    #[test]
    fn load_missing_file() {
        let result = Settings::load(Path::new("/nonexistent/settings.json"));
        assert!(matches!(result, Err(ApiError::Config { .. })));
    }

    #[test]
    fn load_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "endpoint = nope").unwrap();
        let result = Settings::load(file.path());
        assert!(matches!(result, Err(ApiError::Config { .. })));
    }
}
