//! Validated request parameters.
//!
//! [`QueryParams`] is built once per request from route segments and the query
//! string, and never mutated afterwards.

use url::Url;

use crate::config::Settings;
use crate::error::ApiError;
use crate::pagination::PaginationState;
use crate::prefixes::PrefixRegistry;
use crate::query::{SortOrder, SparqlIri};

/// Origin used for hypermedia links when the request does not supply `base_url`.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5100/";

/// Context name addressing [`Settings::root_context`] itself.
pub const ROOT_CONTEXT_NAME: &str = "_";

const KNOWN_PARAMS: &[&str] = &[
    "graph_uri",
    "class_uri",
    "instance_uri",
    "class_prefix",
    "instance_prefix",
    "lang",
    "page",
    "per_page",
    "do_item_count",
    "sort_by",
    "sort_order",
    "p",
    "o",
    "base_url",
];

/// Path segments of a request: `/<context>/<class>/<instance>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    pub context_name: Option<String>,
    pub class_name: Option<String>,
    pub instance_id: Option<String>,
}

impl Route {
    pub fn new(
        context_name: Option<&str>,
        class_name: Option<&str>,
        instance_id: Option<&str>,
    ) -> Self {
        Self {
            context_name: context_name.map(str::to_string),
            class_name: class_name.map(str::to_string),
            instance_id: instance_id.map(str::to_string),
        }
    }

    pub fn path(&self) -> String {
        [&self.context_name, &self.class_name, &self.instance_id]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub route: Route,
    pub graph_uri: Option<SparqlIri>,
    pub class_uri: Option<SparqlIri>,
    pub instance_uri: Option<SparqlIri>,
    pub lang: Option<String>,
    pub page: u64,
    pub per_page: u64,
    pub do_item_count: bool,
    pub sort_by: Option<SparqlIri>,
    pub sort_order: SortOrder,
    /// `p` filter of instance listings.
    pub predicate: Option<SparqlIri>,
    /// `o` filter of instance listings; an IRI or a literal, decided later.
    pub object: Option<String>,
    /// Request URL including every query parameter.
    pub url: Url,
    /// Parameters the pipeline does not interpret, kept for pass-through.
    pub extra: Vec<(String, String)>,
}

impl QueryParams {
    /// Resolve route segments and query-string pairs.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidParameter` for malformed IRIs, numbers,
    /// language tags or sort orders.
    pub fn resolve(
        route: Route,
        query: &[(String, String)],
        registry: &PrefixRegistry,
        settings: &Settings,
    ) -> Result<Self, ApiError> {
        let get = |name: &str| {
            query
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        let iri_param = |name: &str| -> Result<Option<SparqlIri>, ApiError> {
            get(name)
                .map(|value| SparqlIri::param(name, &registry.expand(value)))
                .transpose()
        };

        let graph_uri = match iri_param("graph_uri")? {
            Some(graph) => Some(graph),
            None => route
                .context_name
                .as_deref()
                .map(|name| graph_for_context(name, registry, settings))
                .transpose()?,
        };

        let class_prefix = iri_param("class_prefix")?.or_else(|| graph_uri.clone());
        let class_uri = match iri_param("class_uri")? {
            Some(class) => Some(class),
            None => match (&class_prefix, &route.class_name) {
                (Some(prefix), Some(name)) => Some(join_param("class_uri", prefix, name)?),
                _ => None,
            },
        };

        let instance_prefix = match iri_param("instance_prefix")? {
            Some(prefix) => Some(prefix),
            None => class_uri
                .as_ref()
                .map(|class| join_param("instance_prefix", class, "/"))
                .transpose()?,
        };
        let instance_uri = match iri_param("instance_uri")? {
            Some(instance) => Some(instance),
            None => match (&instance_prefix, &route.instance_id) {
                (Some(prefix), Some(id)) => Some(join_param("instance_uri", prefix, id)?),
                _ => None,
            },
        };

        let lang = get("lang").map(parse_lang).transpose()?;
        let page = get("page")
            .map(|v| parse_number("page", v))
            .transpose()?
            .unwrap_or(0);
        let per_page = get("per_page")
            .map(|v| parse_number("per_page", v))
            .transpose()?
            .unwrap_or(settings.default_per_page);
        if per_page == 0 || per_page > settings.max_per_page {
            return Err(ApiError::InvalidParameter {
                name: "per_page".into(),
                value: per_page.to_string(),
                reason: format!("must be between 1 and {}", settings.max_per_page),
            });
        }
        let do_item_count = get("do_item_count")
            .map(|v| parse_flag("do_item_count", v))
            .transpose()?
            .unwrap_or(false);
        let sort_order = get("sort_order")
            .map(|v| {
                SortOrder::parse(v).ok_or_else(|| ApiError::InvalidParameter {
                    name: "sort_order".into(),
                    value: v.to_string(),
                    reason: "expected asc or desc".into(),
                })
            })
            .transpose()?
            .unwrap_or_default();

        let base = get("base_url").unwrap_or(DEFAULT_BASE_URL);
        let mut url = Url::parse(base)
            .and_then(|base| base.join(&route.path()))
            .map_err(|e| ApiError::InvalidParameter {
                name: "base_url".into(),
                value: base.to_string(),
                reason: e.to_string(),
            })?;
        let forwarded: Vec<&(String, String)> =
            query.iter().filter(|(k, _)| k != "base_url").collect();
        if !forwarded.is_empty() {
            url.query_pairs_mut().extend_pairs(forwarded);
        }

        Ok(Self {
            graph_uri,
            class_uri,
            instance_uri,
            lang,
            page,
            per_page,
            do_item_count,
            sort_by: iri_param("sort_by")?,
            sort_order,
            predicate: iri_param("p")?,
            object: get("o").map(str::to_string),
            url,
            extra: query
                .iter()
                .filter(|(k, _)| !KNOWN_PARAMS.contains(&k.as_str()))
                .cloned()
                .collect(),
            route,
        })
    }

    pub fn require_graph(&self) -> Result<&SparqlIri, ApiError> {
        self.graph_uri
            .as_ref()
            .ok_or_else(|| ApiError::missing("graph_uri"))
    }

    pub fn require_class(&self) -> Result<&SparqlIri, ApiError> {
        self.class_uri
            .as_ref()
            .ok_or_else(|| ApiError::missing("class_uri"))
    }

    pub fn require_instance(&self) -> Result<&SparqlIri, ApiError> {
        self.instance_uri
            .as_ref()
            .ok_or_else(|| ApiError::missing("instance_uri"))
    }

    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    pub fn pagination(&self) -> PaginationState {
        PaginationState::new(self.page, self.per_page)
    }

    /// Same parameters, different page.
    pub fn with_page(&self, page: u64) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// URL of a related resource under the same origin, without query string.
    pub fn href(&self, path: &str) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.join(path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string())
    }

    /// URL of the addressed resource itself, without query string.
    pub fn resource_href(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.to_string()
    }

    /// URL of the instance collection of the addressed class.
    pub fn collection_href(&self) -> String {
        let class_path = Route {
            instance_id: None,
            ..self.route.clone()
        }
        .path();
        self.href(&format!("/{}", class_path))
    }

    pub fn schema_href(&self) -> String {
        format!("{}/_schema", self.collection_href().trim_end_matches('/'))
    }
}

fn graph_for_context(
    name: &str,
    registry: &PrefixRegistry,
    settings: &Settings,
) -> Result<SparqlIri, ApiError> {
    let graph = if name == ROOT_CONTEXT_NAME {
        settings.root_context.clone()
    } else {
        match registry.namespace(name) {
            Some(namespace) => namespace.to_string(),
            None => format!("{}{}/", settings.root_context, name),
        }
    };
    SparqlIri::param("context_name", &graph)
}

fn join_param(name: &str, prefix: &SparqlIri, suffix: &str) -> Result<SparqlIri, ApiError> {
    prefix.join(suffix).map_err(|reason| ApiError::InvalidParameter {
        name: name.to_string(),
        value: format!("{}{}", prefix.as_str(), suffix),
        reason,
    })
}

fn parse_number(name: &str, value: &str) -> Result<u64, ApiError> {
    value.parse().map_err(|_| ApiError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: "expected a non-negative integer".into(),
    })
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ApiError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(ApiError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: "expected true/false or 1/0".into(),
        }),
    }
}

fn parse_lang(value: &str) -> Result<String, ApiError> {
    oxilangtag::LanguageTag::parse(value)
        .map(|tag| tag.as_str().to_string())
        .map_err(|e| ApiError::InvalidParameter {
            name: "lang".into(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resolve(route: Route, query: &[(&str, &str)]) -> Result<QueryParams, ApiError> {
        QueryParams::resolve(
            route,
            &pairs(query),
            &PrefixRegistry::new(),
            &Settings::default(),
        )
    }

    #[test]
    fn derives_uris_from_route() {
        let params = resolve(
            Route::new(Some("person"), Some("Gender"), Some("Male")),
            &[],
        )
        .unwrap();
        assert_eq!(
            params.graph_uri.as_ref().unwrap().as_str(),
            "http://semantica.globo.com/person/"
        );
        assert_eq!(
            params.class_uri.as_ref().unwrap().as_str(),
            "http://semantica.globo.com/person/Gender"
        );
        assert_eq!(
            params.instance_uri.as_ref().unwrap().as_str(),
            "http://semantica.globo.com/person/Gender/Male"
        );
        assert_eq!(params.page, 0);
        assert_eq!(params.per_page, 10);
        assert_eq!(params.url.as_str(), "http://localhost:5100/person/Gender/Male");
    }

    #[test]
    fn registered_prefix_and_root_context() {
        let params = resolve(Route::new(Some("upper"), None, None), &[]).unwrap();
        assert_eq!(
            params.graph_uri.unwrap().as_str(),
            "http://semantica.globo.com/upper/"
        );
        let params = resolve(Route::new(Some("_"), None, None), &[]).unwrap();
        assert_eq!(params.graph_uri.unwrap().as_str(), "http://semantica.globo.com/");
    }

    #[test]
    fn explicit_uris_override_and_expand_curies() {
        let params = resolve(
            Route::new(Some("person"), Some("Gender"), None),
            &[("class_uri", "upper:Person"), ("graph_uri", "http://example.org/g")],
        )
        .unwrap();
        assert_eq!(
            params.class_uri.unwrap().as_str(),
            "http://semantica.globo.com/upper/Person"
        );
        assert_eq!(params.graph_uri.unwrap().as_str(), "http://example.org/g");
    }

    #[test]
    fn query_string_values() {
        let params = resolve(
            Route::new(Some("person"), Some("Person"), None),
            &[
                ("lang", "pt"),
                ("page", "2"),
                ("per_page", "5"),
                ("do_item_count", "1"),
                ("sort_by", "rdfs:label"),
                ("sort_order", "DESC"),
                ("p", "upper:name"),
                ("o", "Flipper"),
                ("expand_uri", "1"),
            ],
        )
        .unwrap();
        assert_eq!(params.lang(), Some("pt"));
        assert_eq!(params.pagination().offset(), 10);
        assert!(params.do_item_count);
        assert_eq!(params.sort_order, SortOrder::Desc);
        assert_eq!(
            params.sort_by.unwrap().as_str(),
            "http://www.w3.org/2000/01/rdf-schema#label"
        );
        assert_eq!(params.object.as_deref(), Some("Flipper"));
        assert_eq!(params.extra, pairs(&[("expand_uri", "1")]));
        assert!(params.url.as_str().contains("lang=pt"));
    }

    #[test]
    fn invalid_values_are_bad_requests() {
        let route = Route::new(Some("person"), Some("Person"), None);
        for query in [
            vec![("page", "-1")],
            vec![("per_page", "0")],
            vec![("per_page", "1000")],
            vec![("lang", "not a language")],
            vec![("sort_order", "sideways")],
            vec![("do_item_count", "maybe")],
            vec![("graph_uri", "http://bad iri")],
        ] {
            let err = resolve(route.clone(), &query).unwrap_err();
            assert_eq!(err.status_code(), 400, "{:?}", query);
        }
    }

    #[test]
    fn missing_required_parameter_is_named() {
        let params = resolve(Route::new(Some("person"), Some("Person"), None), &[]).unwrap();
        let err = params.require_instance().unwrap_err();
        assert!(matches!(err, ApiError::MissingParameter { ref name } if name == "instance_uri"));
        assert!(err.to_string().contains("instance_uri"));
    }

    #[test]
    fn with_page_leaves_original_untouched() {
        let params = resolve(Route::new(Some("person"), None, None), &[("page", "1")]).unwrap();
        let next = params.with_page(2);
        assert_eq!(params.page, 1);
        assert_eq!(next.page, 2);
    }

    #[test]
    fn href_builds_sibling_urls() {
        let params = resolve(
            Route::new(Some("person"), Some("Person"), None),
            &[("lang", "pt")],
        )
        .unwrap();
        assert_eq!(
            params.href("/person/Person/_schema"),
            "http://localhost:5100/person/Person/_schema"
        );
    }

    #[test]
    fn collection_and_schema_hrefs_drop_instance() {
        let params = resolve(
            Route::new(Some("person"), Some("Person"), Some("1")),
            &[("lang", "pt")],
        )
        .unwrap();
        assert_eq!(params.resource_href(), "http://localhost:5100/person/Person/1");
        assert_eq!(params.collection_href(), "http://localhost:5100/person/Person");
        assert_eq!(
            params.schema_href(),
            "http://localhost:5100/person/Person/_schema"
        );
    }
}
