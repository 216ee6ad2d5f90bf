//! Class schema documents.

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::cardinality;
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::interpret::best_literal;
use crate::pagination::Link;
use crate::params::QueryParams;
use crate::prefixes::Context;
use crate::query::SparqlIri;
use crate::schema;
use crate::sparql::Row;

pub const JSON_SCHEMA_DRAFT: &str = "http://json-schema.org/draft-04/schema#";

/// Assembles the JSON Schema describing instances of a class.
#[derive(Debug, Clone, Copy)]
pub struct ClassSchemaAssembler<'g> {
    gateway: &'g Gateway,
}

impl<'g> ClassSchemaAssembler<'g> {
    pub fn new(gateway: &'g Gateway) -> Self {
        Self { gateway }
    }

    /// # Errors
    ///
    /// `MissingParameter` without graph or class, `NotFound` when the class
    /// is not defined in the graph, upstream errors from the triplestore.
    pub fn get(&self, params: &QueryParams) -> Result<Value, ApiError> {
        let graph = params.require_graph()?;
        let class = params.require_class()?;
        let lang = params.lang();
        let store = self.gateway.store();
        let composer = self.gateway.composer();

        let info = store.select(&composer.class_info(graph, class, lang))?;
        if info.is_empty() {
            return Err(ApiError::not_found(format!(
                "class {} not found in graph {}",
                class.as_str(),
                graph.as_str()
            )));
        }
        let title = best_literal(info.iter().map(|r| r.get("title")), lang);
        let comment = best_literal(info.iter().map(|r| r.get("comment")), lang);

        let predicates = self.predicate_rows(class, lang)?;
        let restrictions = store.select(&composer.cardinalities(class))?;
        let cardinalities = cardinality::synthesize(&restrictions, lang);

        let mut ctx = Context::new(self.gateway.registry(), lang);
        let properties = schema::build(&predicates, &cardinalities, lang, &mut ctx);

        let mut doc = Map::new();
        doc.insert("$schema".into(), json!(JSON_SCHEMA_DRAFT));
        doc.insert("@id".into(), json!(class.as_str()));
        // filled in once every URI has been shortened
        doc.insert("@context".into(), Value::Null);
        doc.insert("type".into(), json!("object"));
        if let Some(title) = title {
            doc.insert("title".into(), json!(title));
        }
        if let Some(comment) = comment {
            doc.insert("comment".into(), json!(comment));
        }
        doc.insert("properties".into(), Value::Object(properties.properties));
        doc.insert("required".into(), json!(properties.required));
        doc.insert("links".into(), json!(self.links(params)));
        doc.insert("@context".into(), ctx.to_json());
        Ok(Value::Object(doc))
    }

    /// Predicate rows in the requested language, or in any language when the
    /// ontology has no labels in it.
    fn predicate_rows(&self, class: &SparqlIri, lang: Option<&str>) -> Result<Vec<Row>, ApiError> {
        let store = self.gateway.store();
        let composer = self.gateway.composer();

        let rows = store.select(&composer.predicates(class, lang))?;
        if rows.is_empty() && lang.is_some() {
            warn!(
                class = class.as_str(),
                lang = lang.unwrap_or_default(),
                "no predicates labelled in requested language, retrying without filter"
            );
            return store.select(&composer.predicates(class, None));
        }
        Ok(rows)
    }

    fn links(&self, params: &QueryParams) -> Vec<Link> {
        vec![
            Link::new("self", "GET", params.schema_href()),
            Link::new("instances", "GET", params.collection_href()),
            Link::new("create", "POST", params.collection_href()),
        ]
    }
}
