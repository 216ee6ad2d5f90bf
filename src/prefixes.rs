//! Prefix table and URI compaction.
//!
//! URIs travel through the pipeline in two forms: expanded (`http://...`) and
//! compact (`prefix:local`). The [`PrefixRegistry`] converts between them and
//! is immutable once built. A [`Context`] is the per-response working copy that
//! remembers which prefixes were used so they can be emitted in `@context`.
//!
//! Unknown prefixes are never an error: the URI is passed through unchanged.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Namespace under which every named graph of the knowledge base lives.
pub const ROOT_CONTEXT: &str = "http://semantica.globo.com/";

/// Prefixes known to every registry.
pub const STANDARD_PREFIXES: &[(&str, &str)] = &[
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("dc", "http://purl.org/dc/elements/1.1/"),
    ("dct", "http://purl.org/dc/terms/"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("geo", "http://www.w3.org/2003/01/geo/wgs84_pos#"),
    ("schema", "http://schema.org/"),
    ("dbpedia", "http://dbpedia.org/ontology/"),
    ("upper", "http://semantica.globo.com/upper/"),
    ("base", "http://semantica.globo.com/base/"),
];

/// Bidirectional mapping between namespaces and prefix names.
#[derive(Debug, Clone)]
pub struct PrefixRegistry {
    prefixes: BTreeMap<String, String>,
}

impl Default for PrefixRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixRegistry {
    /// Registry holding [`STANDARD_PREFIXES`].
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for (prefix, namespace) in STANDARD_PREFIXES {
            registry.insert(*prefix, *namespace);
        }
        registry
    }

    pub fn empty() -> Self {
        Self {
            prefixes: BTreeMap::new(),
        }
    }

    /// Standard prefixes plus `extra`; entries in `extra` win on conflict.
    pub fn with_prefixes<I, P, N>(extra: I) -> Self
    where
        I: IntoIterator<Item = (P, N)>,
        P: Into<String>,
        N: Into<String>,
    {
        let mut registry = Self::new();
        for (prefix, namespace) in extra {
            registry.insert(prefix, namespace);
        }
        registry
    }

    /// Register a prefix. Only meant for process start; the registry is shared
    /// read-only afterwards.
    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }

    /// Expand a CURIE into a full URI.
    ///
    /// Input that is not compact, or whose prefix is unknown, is returned as-is.
    pub fn expand(&self, curie_or_uri: &str) -> String {
        expand_with(curie_or_uri, |prefix| self.namespace(prefix))
    }

    /// Compact a URI using the longest registered namespace that prefixes it.
    pub fn shorten(&self, uri: &str) -> String {
        match self.longest_match(uri) {
            Some((prefix, namespace)) => format!("{}:{}", prefix, &uri[namespace.len()..]),
            None => uri.to_string(),
        }
    }

    /// Short name for a graph URI: the prefix name when `uri` is exactly a
    /// registered namespace, the compacted URI otherwise.
    pub fn slug(&self, uri: &str) -> String {
        self.prefixes
            .iter()
            .find(|(_, namespace)| namespace.as_str() == uri)
            .map(|(prefix, _)| prefix.clone())
            .unwrap_or_else(|| self.shorten(uri))
    }

    fn longest_match(&self, uri: &str) -> Option<(&str, &str)> {
        if is_blank_node(uri) {
            return None;
        }
        self.prefixes
            .iter()
            .filter(|(_, namespace)| !namespace.is_empty() && uri.starts_with(namespace.as_str()))
            .max_by_key(|(_, namespace)| namespace.len())
            .map(|(prefix, namespace)| (prefix.as_str(), namespace.as_str()))
    }
}

/// True if `s` looks like a CURIE: it has a colon that is not the start of
/// a `://` scheme separator.
pub fn is_compact(s: &str) -> bool {
    match s.find(':') {
        Some(idx) => idx > 0 && !s[idx + 1..].starts_with("//"),
        None => false,
    }
}

/// Blank nodes as reported by the triplestore (`nodeID://b1`, `_:b1`).
pub fn is_blank_node(s: &str) -> bool {
    s.starts_with("nodeID://") || s.starts_with("_:")
}

fn expand_with<'a>(s: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    if !is_compact(s) || is_blank_node(s) {
        return s.to_string();
    }
    let Some((prefix, local)) = s.split_once(':') else {
        return s.to_string();
    };
    match lookup(prefix) {
        Some(namespace) => format!("{}{}", namespace, local),
        None => s.to_string(),
    }
}

/// Per-response view over the registry.
///
/// Records every prefix used while shortening, and accepts request-local
/// prefixes (from a body's `@context`) that shadow the registry.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    registry: &'a PrefixRegistry,
    language: Option<String>,
    local: BTreeMap<String, String>,
    used: BTreeMap<String, String>,
}

impl<'a> Context<'a> {
    pub fn new(registry: &'a PrefixRegistry, language: Option<&str>) -> Self {
        Self {
            registry,
            language: language.map(str::to_string),
            local: BTreeMap::new(),
            used: BTreeMap::new(),
        }
    }

    pub fn registry(&self) -> &'a PrefixRegistry {
        self.registry
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Add a request-local prefix.
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.local.insert(prefix.into(), namespace.into());
    }

    /// Request-local prefixes, in prefix order.
    pub fn local_prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.local.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }

    pub fn expand(&self, curie_or_uri: &str) -> String {
        expand_with(curie_or_uri, |prefix| {
            self.local
                .get(prefix)
                .map(String::as_str)
                .or_else(|| self.registry.namespace(prefix))
        })
    }

    /// Shorten through the registry, remembering the prefix used.
    pub fn shorten(&mut self, uri: &str) -> String {
        match self.registry.longest_match(uri) {
            Some((prefix, namespace)) => {
                self.used
                    .entry(prefix.to_string())
                    .or_insert_with(|| namespace.to_string());
                format!("{}:{}", prefix, &uri[namespace.len()..])
            }
            None => uri.to_string(),
        }
    }

    /// Render the `@context` section.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(lang) = &self.language {
            map.insert("@language".to_string(), Value::String(lang.clone()));
        }
        for (prefix, namespace) in self.used.iter().chain(self.local.iter()) {
            map.insert(prefix.clone(), Value::String(namespace.clone()));
        }
        Value::Object(map)
    }
}
