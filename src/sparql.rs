//! Typed SPARQL results and the triplestore boundary.
//!
//! SPARQL 1.1 JSON results are decoded exactly once, here, into [`Term`]s.
//! Everything downstream works with typed values instead of nested maps.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ApiError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Media type requested from the endpoint.
pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// A single bound (or unbound) value in a result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Uri(String),
    Literal {
        value: String,
        lang: Option<String>,
        datatype: Option<String>,
    },
    BlankNode(String),
    /// Variable absent from the row, typically an unmatched `OPTIONAL`.
    Unbound,
}

static UNBOUND: Term = Term::Unbound;

impl Term {
    pub fn uri(value: impl Into<String>) -> Self {
        Term::Uri(value.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            lang: None,
            datatype: None,
        }
    }

    pub fn lang_literal(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            lang: Some(lang.into()),
            datatype: None,
        }
    }

    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            lang: None,
            datatype: Some(datatype.into()),
        }
    }

    /// Lexical value, `None` when unbound.
    pub fn value(&self) -> Option<&str> {
        match self {
            Term::Uri(v) | Term::BlankNode(v) => Some(v),
            Term::Literal { value, .. } => Some(value),
            Term::Unbound => None,
        }
    }

    pub fn lang(&self) -> Option<&str> {
        match self {
            Term::Literal { lang, .. } => lang.as_deref(),
            _ => None,
        }
    }

    pub fn is_uri(&self) -> bool {
        matches!(self, Term::Uri(_))
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self, Term::Unbound)
    }
}

/// One result row: variable name to term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(BTreeMap<String, Term>);

impl Row {
    /// Term bound to `var`, or [`Term::Unbound`].
    pub fn get(&self, var: &str) -> &Term {
        self.0.get(var).unwrap_or(&UNBOUND)
    }

    pub fn value(&self, var: &str) -> Option<&str> {
        self.get(var).value()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Term)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Term)>>(iter: I) -> Self {
        Row(iter
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .filter(|(_, v)| v.is_bound())
            .collect())
    }
}

/// Decoded endpoint response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SparqlResponse {
    Select { vars: Vec<String>, rows: Vec<Row> },
    Ask(bool),
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(default)]
    head: RawHead,
    results: Option<RawResults>,
    boolean: Option<bool>,
}

#[derive(Deserialize, Default)]
struct RawHead {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Deserialize)]
struct RawResults {
    bindings: Vec<BTreeMap<String, RawTerm>>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum RawTerm {
    Uri {
        value: String,
    },
    Literal {
        value: String,
        #[serde(rename = "xml:lang", alias = "lang")]
        lang: Option<String>,
        datatype: Option<String>,
    },
    TypedLiteral {
        value: String,
        datatype: Option<String>,
    },
    Bnode {
        value: String,
    },
}

impl From<RawTerm> for Term {
    fn from(raw: RawTerm) -> Self {
        match raw {
            RawTerm::Uri { value } => Term::Uri(value),
            RawTerm::Literal {
                value,
                lang,
                datatype,
            } => Term::Literal {
                value,
                lang,
                datatype,
            },
            RawTerm::TypedLiteral { value, datatype } => Term::Literal {
                value,
                lang: None,
                datatype,
            },
            RawTerm::Bnode { value } => Term::BlankNode(value),
        }
    }
}

impl SparqlResponse {
    /// Decode a SPARQL 1.1 JSON results document.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidResponse` for malformed JSON and
    /// `ApiError::Upstream` when the document is neither SELECT nor ASK shaped.
    pub fn from_json(body: &str) -> Result<Self, ApiError> {
        let raw: RawResponse =
            serde_json::from_str(body).map_err(|source| ApiError::InvalidResponse { source })?;

        if let Some(results) = raw.results {
            let rows = results
                .bindings
                .into_iter()
                .map(|binding| Row(binding.into_iter().map(|(k, v)| (k, v.into())).collect()))
                .collect();
            return Ok(SparqlResponse::Select {
                vars: raw.head.vars,
                rows,
            });
        }

        raw.boolean
            .map(SparqlResponse::Ask)
            .ok_or_else(|| ApiError::upstream("response has neither results nor boolean"))
    }

    pub fn rows(&self) -> &[Row] {
        match self {
            SparqlResponse::Select { rows, .. } => rows,
            SparqlResponse::Ask(_) => &[],
        }
    }
}

/// Executes SPARQL against a triplestore.
///
/// The only seam between the pipeline and the network.
pub trait Triplestore {
    fn query(&self, sparql: &str) -> Result<SparqlResponse, ApiError>;

    /// Run a SELECT (or write) query and return its rows.
    fn select(&self, sparql: &str) -> Result<Vec<Row>, ApiError> {
        match self.query(sparql)? {
            SparqlResponse::Select { rows, .. } => Ok(rows),
            SparqlResponse::Ask(_) => Err(ApiError::upstream(
                "expected result bindings, got a boolean",
            )),
        }
    }

    /// Run an ASK query.
    fn ask(&self, sparql: &str) -> Result<bool, ApiError> {
        match self.query(sparql)? {
            SparqlResponse::Ask(answer) => Ok(answer),
            SparqlResponse::Select { .. } => Err(ApiError::upstream(
                "expected a boolean, got result bindings",
            )),
        }
    }
}

impl<T: Triplestore + ?Sized> Triplestore for &T {
    fn query(&self, sparql: &str) -> Result<SparqlResponse, ApiError> {
        (**self).query(sparql)
    }
}

impl<T: Triplestore + ?Sized> Triplestore for Box<T> {
    fn query(&self, sparql: &str) -> Result<SparqlResponse, ApiError> {
        (**self).query(sparql)
    }
}

/// SPARQL endpoint reached over HTTP.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug)]
pub struct HttpTriplestore {
    endpoint: String,
    client: reqwest::blocking::Client,
    credentials: Option<(String, String)>,
}

#[cfg(feature = "remote")]
impl HttpTriplestore {
    /// # Errors
    ///
    /// Returns `ApiError::NetworkError` if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let endpoint = endpoint.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ApiError::NetworkError {
                endpoint: endpoint.clone(),
                source,
            })?;
        Ok(Self {
            endpoint,
            client,
            credentials: None,
        })
    }

    /// Use HTTP basic auth on every request.
    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn network_error(&self, source: reqwest::Error) -> ApiError {
        ApiError::NetworkError {
            endpoint: self.endpoint.clone(),
            source,
        }
    }
}

#[cfg(feature = "remote")]
impl Triplestore for HttpTriplestore {
    fn query(&self, sparql: &str) -> Result<SparqlResponse, ApiError> {
        tracing::debug!(endpoint = %self.endpoint, query = %sparql, "executing SPARQL");

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", sparql), ("format", SPARQL_RESULTS_JSON)]);
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, Some(password));
        }

        let response = request.send().map_err(|e| self.network_error(e))?;

        // Check for HTTP errors before decoding
        let response = response
            .error_for_status()
            .map_err(|e| self.network_error(e))?;

        let body = response.text().map_err(|e| self.network_error(e))?;
        SparqlResponse::from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_select_results() {
        let body = r#"{
            "head": {"vars": ["s", "label", "n"]},
            "results": {"bindings": [
                {
                    "s": {"type": "uri", "value": "http://example.org/a"},
                    "label": {"type": "literal", "xml:lang": "pt", "value": "Pessoa"},
                    "n": {"type": "typed-literal", "datatype": "http://www.w3.org/2001/XMLSchema#integer", "value": "3"}
                },
                {
                    "s": {"type": "bnode", "value": "nodeID://b1"}
                }
            ]}
        }"#;
        let response = SparqlResponse::from_json(body).unwrap();
        let rows = response.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("s"), &Term::uri("http://example.org/a"));
        assert_eq!(rows[0].get("label").lang(), Some("pt"));
        assert_eq!(
            rows[0].get("n"),
            &Term::typed_literal("3", "http://www.w3.org/2001/XMLSchema#integer")
        );
        assert_eq!(rows[1].get("s"), &Term::BlankNode("nodeID://b1".into()));
        assert_eq!(rows[1].get("label"), &Term::Unbound);
        assert_eq!(rows[1].value("label"), None);
    }

    #[test]
    fn decode_plain_lang_key() {
        let body = r#"{"head": {"vars": ["l"]}, "results": {"bindings": [
            {"l": {"type": "literal", "lang": "en", "value": "Person"}}
        ]}}"#;
        let response = SparqlResponse::from_json(body).unwrap();
        assert_eq!(response.rows()[0].get("l"), &Term::lang_literal("Person", "en"));
    }

    #[test]
    fn decode_ask() {
        let response = SparqlResponse::from_json(r#"{"head": {}, "boolean": true}"#).unwrap();
        assert_eq!(response, SparqlResponse::Ask(true));
        assert!(response.rows().is_empty());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            SparqlResponse::from_json("<html>"),
            Err(ApiError::InvalidResponse { .. })
        ));
        assert!(matches!(
            SparqlResponse::from_json(r#"{"head": {"vars": []}}"#),
            Err(ApiError::Upstream { .. })
        ));
    }

    #[test]
    fn row_from_iter_drops_unbound() {
        let row: Row = [("a", Term::literal("x")), ("b", Term::Unbound)]
            .into_iter()
            .collect();
        assert_eq!(row.iter().count(), 1);
        assert!(!row.get("b").is_bound());
    }

    struct Fixed(SparqlResponse);

    impl Triplestore for Fixed {
        fn query(&self, _sparql: &str) -> Result<SparqlResponse, ApiError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn ask_and_select_reject_wrong_shape() {
        let ask = Fixed(SparqlResponse::Ask(false));
        assert!(!ask.ask("ASK {}").unwrap());
        assert!(matches!(ask.select("SELECT"), Err(ApiError::Upstream { .. })));

        let select = Fixed(SparqlResponse::Select {
            vars: vec![],
            rows: vec![],
        });
        assert!(select.select("SELECT").unwrap().is_empty());
        assert!(matches!(select.ask("ASK {}"), Err(ApiError::Upstream { .. })));
    }
}
