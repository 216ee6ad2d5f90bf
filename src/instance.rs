//! Instance documents, listings and writes.

use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::interpret::{best_literal, compress, dedupe_by_id, get_single, resource_id};
use crate::pagination::{self, Link};
use crate::params::QueryParams;
use crate::patch::{apply_patch, parse_patch};
use crate::prefixes::{Context, PrefixRegistry};
use crate::query::{InstanceListing, Object, SparqlIri, Triple};
use crate::schema::xsd_to_json;
use crate::sparql::{Row, Term};
use crate::validator::validate_instance;

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";

/// Keys of an instance document that do not name predicates.
const RESERVED_KEYS: &[&str] = &["title", "links", "$schema"];

/// Fragments of the `callret-0` message of an acknowledged write.
const WRITE_ACKNOWLEDGEMENTS: &[&str] = &["-- done", "triples"];

/// Reads and writes instances of a class.
#[derive(Debug, Clone, Copy)]
pub struct InstanceAssembler<'g> {
    gateway: &'g Gateway,
}

impl<'g> InstanceAssembler<'g> {
    pub fn new(gateway: &'g Gateway) -> Self {
        Self { gateway }
    }

    /// Fetch one instance.
    ///
    /// # Errors
    ///
    /// `MissingParameter` without class or instance URI, `NotFound` when the
    /// instance has no triples, upstream errors from the triplestore.
    pub fn get(&self, params: &QueryParams) -> Result<Value, ApiError> {
        self.document(params).map(Value::Object)
    }

    fn document(&self, params: &QueryParams) -> Result<Map<String, Value>, ApiError> {
        let class = params.require_class()?;
        let instance = params.require_instance()?;
        let lang = params.lang();

        let query = self.gateway.composer().instance(class, instance, lang);
        let rows = self.gateway.store().select(&query)?;
        if rows.is_empty() {
            return Err(ApiError::not_found(format!(
                "instance {} of class {} not found",
                instance.as_str(),
                class.as_str()
            )));
        }

        let mut ctx = Context::new(self.gateway.registry(), lang);
        let title = best_literal(rows.iter().map(|r| r.get("label")), lang);

        let mut doc = Map::new();
        doc.insert("@id".into(), json!(instance.as_str()));
        doc.insert("@type".into(), json!(ctx.shorten(class.as_str())));
        doc.insert("@context".into(), Value::Null);
        doc.insert("$schema".into(), json!(params.schema_href()));
        if let Some(title) = title {
            doc.insert("title".into(), json!(title));
        }
        for (key, value) in group_predicates(&rows, &mut ctx) {
            doc.insert(key, value);
        }
        let resource = params.resource_href();
        doc.insert(
            "links".into(),
            json!([
                Link::new("self", "GET", resource.clone()),
                Link::new("class", "GET", params.schema_href()),
                Link::new("edit", "PUT", resource.clone()),
                Link::new("patch", "PATCH", resource.clone()),
                Link::new("delete", "DELETE", resource),
            ]),
        );
        doc.insert("@context".into(), ctx.to_json());
        Ok(doc)
    }

    /// One page of instances of a class.
    ///
    /// # Errors
    ///
    /// `MissingParameter` without graph or class, `NotFound` for an empty page.
    pub fn list(&self, params: &QueryParams) -> Result<Value, ApiError> {
        let graph = params.require_graph()?;
        let class = params.require_class()?;
        let lang = params.lang();
        let store = self.gateway.store();
        let composer = self.gateway.composer();

        let object = params
            .object
            .as_deref()
            .map(|o| object_filter(o, self.gateway.registry()));
        let listing = InstanceListing {
            graph,
            class,
            lang,
            predicate: params.predicate.as_ref(),
            object: object.as_ref(),
            sort_by: params.sort_by.as_ref().map(|by| (by, params.sort_order)),
        };

        let state = params.pagination();
        let query = composer.list_instances(&listing, state.per_page, state.offset());
        let rows = store.select(&query)?;
        if rows.is_empty() {
            return Err(ApiError::not_found(format!(
                "no instances of {} on page {}",
                class.as_str(),
                params.page
            )));
        }
        let total = if params.do_item_count {
            Some(self.gateway.count(&composer.count_instances(&listing))?)
        } else {
            None
        };

        let mut ctx = Context::new(self.gateway.registry(), lang);
        let sort_key = params.sort_by.as_ref().map(|by| ctx.shorten(by.as_str()));
        let mut keymap = vec![("subject", "@id"), ("label", "title")];
        if let Some(key) = &sort_key {
            keymap.push(("sort_object", key.as_str()));
        }
        let items: Vec<Value> = dedupe_by_id(compress(&rows, &keymap, None))
            .into_iter()
            .map(with_resource_id)
            .collect();

        let mut links = pagination::links(&params.url, &state.with_total(total));
        links.push(Link::new("class", "GET", params.schema_href()));
        links.push(Link::new("create", "POST", params.collection_href()));

        let mut doc = Map::new();
        doc.insert("@id".into(), json!(params.collection_href()));
        doc.insert("@context".into(), ctx.to_json());
        doc.insert("items".into(), Value::Array(items));
        if let Some(total) = total {
            doc.insert("item_count".into(), json!(total));
        }
        doc.insert("links".into(), json!(links));
        Ok(Value::Object(doc))
    }

    /// Create an instance from a JSON document.
    ///
    /// The instance URI is the body's `@id`, or the class URI followed by a
    /// fresh UUID.
    ///
    /// # Errors
    ///
    /// `Invalid` when the body does not satisfy the class schema, `BadRequest`
    /// for predicates the class does not have, `Upstream` when the write is
    /// not acknowledged.
    pub fn create(&self, params: &QueryParams, body: &Value) -> Result<Value, ApiError> {
        let graph = params.require_graph()?;
        let class = params.require_class()?;
        let fields = as_fields(body)?;

        let schema = self.gateway.class_schemas().get(params)?;
        validate_instance(&schema, body)?;

        let ctx = self.body_context(params, fields)?;
        let instance = match fields.get("@id").and_then(Value::as_str) {
            Some(id) => SparqlIri::param("@id", &ctx.expand(id))?,
            None => mint(class)?,
        };
        let triples = build_triples(&instance, class, fields, &schema, &ctx)?;
        let prefixes = local_prefixes(&ctx)?;

        let query = self
            .gateway
            .composer()
            .insert_instance(graph, &prefixes, &triples);
        self.write(&query, "create", &instance)?;

        let id = resource_id(instance.as_str());
        Ok(json!({
            "@id": instance.as_str(),
            "resource_id": id,
            "links": [Link::new("self", "GET", format!("{}/{}", params.collection_href(), id))]
        }))
    }

    /// Replace every predicate of an existing instance.
    ///
    /// # Errors
    ///
    /// As [`InstanceAssembler::create`], plus `NotFound` for a missing instance.
    pub fn edit(&self, params: &QueryParams, body: &Value) -> Result<Value, ApiError> {
        let graph = params.require_graph()?;
        let class = params.require_class()?;
        let instance = params.require_instance()?;
        let fields = as_fields(body)?;

        self.ensure_exists(graph, instance)?;
        let schema = self.gateway.class_schemas().get(params)?;
        validate_instance(&schema, body)?;

        let ctx = self.body_context(params, fields)?;
        let triples = build_triples(instance, class, fields, &schema, &ctx)?;
        let prefixes = local_prefixes(&ctx)?;

        let query = self
            .gateway
            .composer()
            .modify_instance(graph, instance, &prefixes, &triples);
        self.write(&query, "edit", instance)?;

        Ok(json!({
            "@id": instance.as_str(),
            "links": [Link::new("self", "GET", params.resource_href())]
        }))
    }

    /// Apply patch operations to the current document and store the result.
    pub fn patch(&self, params: &QueryParams, ops: &Value) -> Result<Value, ApiError> {
        let ops = parse_patch(ops)?;
        let current = self.document(params)?;
        let patched = apply_patch(&current, &ops);
        self.edit(params, &Value::Object(patched))
    }

    /// # Errors
    ///
    /// `NotFound` when the instance has no triples in the graph.
    pub fn delete(&self, params: &QueryParams) -> Result<(), ApiError> {
        let graph = params.require_graph()?;
        let instance = params.require_instance()?;

        self.ensure_exists(graph, instance)?;
        let query = self.gateway.composer().delete_instance(graph, instance);
        self.write(&query, "delete", instance)
    }

    fn ensure_exists(&self, graph: &SparqlIri, instance: &SparqlIri) -> Result<(), ApiError> {
        let query = self.gateway.composer().instance_exists(graph, instance);
        if self.gateway.store().ask(&query)? {
            Ok(())
        } else {
            Err(ApiError::not_found(format!(
                "instance {} not found in graph {}",
                instance.as_str(),
                graph.as_str()
            )))
        }
    }

    fn write(&self, sparql: &str, action: &str, instance: &SparqlIri) -> Result<(), ApiError> {
        let rows = self.gateway.store().select(sparql)?;
        let message = get_single(&rows, "callret-0").unwrap_or_default();
        if WRITE_ACKNOWLEDGEMENTS.iter().any(|ack| message.contains(ack)) {
            info!(instance = instance.as_str(), action, "instance written");
            Ok(())
        } else {
            warn!(instance = instance.as_str(), action, message, "write not acknowledged");
            Err(ApiError::upstream(format!(
                "{} of {} was not acknowledged by the triplestore",
                action,
                instance.as_str()
            )))
        }
    }

    /// Rendering context carrying the prefixes declared in the body's `@context`.
    fn body_context(
        &self,
        params: &QueryParams,
        fields: &Map<String, Value>,
    ) -> Result<Context<'g>, ApiError> {
        let mut ctx = Context::new(self.gateway.registry(), params.lang());
        if let Some(Value::Object(prefixes)) = fields.get("@context") {
            for (prefix, namespace) in prefixes {
                if prefix.starts_with('@') {
                    continue;
                }
                let Some(namespace) = namespace.as_str() else {
                    continue;
                };
                if !is_prefix_name(prefix) {
                    return Err(ApiError::bad_request(format!(
                        "invalid prefix name in @context: {}",
                        prefix
                    )));
                }
                ctx.add_prefix(prefix.as_str(), namespace);
            }
        }
        Ok(ctx)
    }
}

fn as_fields(body: &Value) -> Result<&Map<String, Value>, ApiError> {
    body.as_object()
        .ok_or_else(|| ApiError::bad_request("instance body must be a JSON object"))
}

fn mint(class: &SparqlIri) -> Result<SparqlIri, ApiError> {
    class
        .join(&format!("/{}", Uuid::new_v4()))
        .map_err(|reason| ApiError::InvalidParameter {
            name: "class_uri".into(),
            value: class.as_str().to_string(),
            reason,
        })
}

fn is_prefix_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn local_prefixes(ctx: &Context<'_>) -> Result<Vec<(String, SparqlIri)>, ApiError> {
    ctx.local_prefixes()
        .map(|(prefix, namespace)| {
            Ok::<_, ApiError>((prefix.to_string(), SparqlIri::param("@context", namespace)?))
        })
        .collect()
}

fn with_resource_id(mut item: Map<String, Value>) -> Value {
    let id = item
        .get("@id")
        .and_then(Value::as_str)
        .map(|id| resource_id(id).to_string());
    if let Some(id) = id {
        item.insert("resource_id".into(), json!(id));
    }
    Value::Object(item)
}

/// The `o` filter of a listing: an IRI when it expands to one, a literal otherwise.
fn object_filter(value: &str, registry: &PrefixRegistry) -> Object {
    match SparqlIri::parse(&registry.expand(value)) {
        Ok(iri) => Object::Iri(iri),
        Err(_) => Object::plain(value),
    }
}

/// Fold instance rows into `(predicate CURIE, value)` pairs.
///
/// Multi-valued predicates become lists, except `rdfs:label` which keeps the
/// literal best matching the context language. A super-property whose values
/// are all repeated by one of its sub-properties is dropped.
fn group_predicates(rows: &[Row], ctx: &mut Context<'_>) -> Vec<(String, Value)> {
    let mut values: Vec<(&str, Vec<Value>)> = Vec::new();
    let mut supers: Vec<(&str, &str)> = Vec::new();
    let mut labels: Vec<&Term> = Vec::new();

    for row in rows {
        let Some(predicate) = row.value("predicate") else {
            continue;
        };
        if predicate == RDF_TYPE {
            continue;
        }
        if predicate == RDFS_LABEL {
            if !values.iter().any(|(p, _)| *p == predicate) {
                values.push((predicate, Vec::new()));
            }
            labels.push(row.get("object"));
            continue;
        }
        let Some(value) = term_to_json(row.get("object"), ctx) else {
            continue;
        };
        let idx = match values.iter().position(|(p, _)| *p == predicate) {
            Some(idx) => idx,
            None => {
                values.push((predicate, Vec::new()));
                values.len() - 1
            }
        };
        if !values[idx].1.contains(&value) {
            values[idx].1.push(value);
        }
        if let Some(sup) = row.value("super_property") {
            if sup != predicate && !supers.contains(&(predicate, sup)) {
                supers.push((predicate, sup));
            }
        }
    }

    let values_of = |predicate: &str| {
        values
            .iter()
            .find(|(p, _)| *p == predicate)
            .map(|(_, v)| v)
    };
    let redundant: Vec<&str> = supers
        .iter()
        .filter(|(sub, sup)| match (values_of(*sub), values_of(*sup)) {
            (Some(sub_values), Some(sup_values)) => {
                !sup_values.is_empty() && sup_values.iter().all(|v| sub_values.contains(v))
            }
            _ => false,
        })
        .map(|(_, sup)| *sup)
        .collect();
    let label = best_literal(labels, ctx.language()).map(|label| json!(label));

    values
        .into_iter()
        .filter(|(p, _)| !redundant.contains(p))
        .filter_map(|(p, mut v)| {
            let value = if p == RDFS_LABEL {
                label.clone()?
            } else if v.len() == 1 {
                v.remove(0)
            } else {
                Value::Array(v)
            };
            Some((ctx.shorten(p), value))
        })
        .collect()
}

fn term_to_json(term: &Term, ctx: &mut Context<'_>) -> Option<Value> {
    match term {
        Term::Uri(uri) => Some(json!(ctx.shorten(uri))),
        Term::BlankNode(id) => Some(json!(id)),
        Term::Literal {
            value,
            datatype: Some(datatype),
            ..
        } => Some(typed_value(value, datatype)),
        Term::Literal { value, .. } => Some(json!(value)),
        Term::Unbound => None,
    }
}

/// JSON value of a typed literal; the lexical form when it does not parse.
fn typed_value(value: &str, datatype: &str) -> Value {
    let parsed = match xsd_to_json(datatype).get("type").and_then(Value::as_str) {
        Some("integer") => value.parse::<i64>().ok().map(Value::from),
        Some("number") => value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        Some("boolean") => match value {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    };
    parsed.unwrap_or_else(|| json!(value))
}

/// How body values of one predicate become triple objects.
enum ValueKind {
    Iri,
    Typed(SparqlIri),
    Plain,
}

impl ValueKind {
    fn of(property: &Value, ctx: &Context<'_>) -> Result<Self, ApiError> {
        if let Some(datatype) = property.get("datatype").and_then(Value::as_str) {
            return Ok(ValueKind::Typed(SparqlIri::param(
                "datatype",
                &ctx.expand(datatype),
            )?));
        }
        match property.get("format").and_then(Value::as_str) {
            Some("uri") => Ok(ValueKind::Iri),
            _ => Ok(ValueKind::Plain),
        }
    }

    fn object(&self, key: &str, value: &Value, ctx: &Context<'_>) -> Result<Object, ApiError> {
        match (self, value) {
            (ValueKind::Iri, Value::String(s)) => {
                Ok(Object::Iri(SparqlIri::param(key, &ctx.expand(s))?))
            }
            (ValueKind::Iri, other) => Err(ApiError::bad_request(format!(
                "{} expects a URI, got {}",
                key, other
            ))),
            (ValueKind::Typed(datatype), value) => Ok(Object::Literal {
                value: lexical(key, value)?,
                datatype: Some(datatype.clone()),
                lang: None,
            }),
            (ValueKind::Plain, value) => Ok(Object::plain(lexical(key, value)?)),
        }
    }
}

fn lexical(key: &str, value: &Value) -> Result<String, ApiError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(ApiError::bad_request(format!(
            "{} expects a literal, got {}",
            key, other
        ))),
    }
}

/// Explicit triples from the body plus the class membership triple.
fn build_triples(
    instance: &SparqlIri,
    class: &SparqlIri,
    fields: &Map<String, Value>,
    schema: &Value,
    ctx: &Context<'_>,
) -> Result<Vec<Triple>, ApiError> {
    let properties = schema.get("properties").and_then(Value::as_object);
    let mut triples = vec![Triple {
        subject: instance.clone(),
        predicate: SparqlIri::param("rdf:type", RDF_TYPE)?,
        object: Object::Iri(class.clone()),
    }];
    let mut labelled = false;

    for (key, value) in fields {
        if key.starts_with('@') || RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let predicate_uri = ctx.expand(key);
        let property = properties
            .and_then(|props| props.iter().find(|(k, _)| ctx.expand(k) == predicate_uri))
            .map(|(_, property)| property);
        let kind = match property {
            Some(property) => ValueKind::of(property, ctx)?,
            None if predicate_uri == RDFS_LABEL => ValueKind::Plain,
            None if predicate_uri == RDF_TYPE => ValueKind::Iri,
            None => {
                return Err(ApiError::bad_request(format!(
                    "{} is not a property of {}",
                    key,
                    class.as_str()
                )))
            }
        };
        labelled |= predicate_uri == RDFS_LABEL;

        let predicate = SparqlIri::param(key, &predicate_uri)?;
        let items: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Null => Vec::new(),
            one => vec![one],
        };
        for item in items {
            let triple = Triple {
                subject: instance.clone(),
                predicate: predicate.clone(),
                object: kind.object(key, item, ctx)?,
            };
            if !triples.contains(&triple) {
                triples.push(triple);
            }
        }
    }

    if !labelled {
        return Err(ApiError::bad_request("instance has no rdfs:label"));
    }
    Ok(triples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Term)]) -> Row {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    fn iri(s: &str) -> SparqlIri {
        SparqlIri::parse(s).unwrap()
    }

    fn person_schema() -> Value {
        json!({
            "properties": {
                "upper:name": {"type": "string", "datatype": "xsd:string"},
                "upper:age": {"type": "integer", "datatype": "xsd:int"},
                "upper:gender": {"type": "string", "format": "uri"}
            }
        })
    }

    #[test]
    fn predicates_group_into_lists() {
        let registry = PrefixRegistry::new();
        let mut ctx = Context::new(&registry, None);
        let rows = vec![
            row(&[
                ("predicate", Term::uri("http://semantica.globo.com/upper/name")),
                ("object", Term::literal("Flipper")),
            ]),
            row(&[
                ("predicate", Term::uri("http://semantica.globo.com/upper/name")),
                ("object", Term::literal("Flip")),
            ]),
            row(&[
                ("predicate", Term::uri(RDF_TYPE)),
                ("object", Term::uri("http://semantica.globo.com/upper/Person")),
            ]),
            row(&[
                ("predicate", Term::uri("http://semantica.globo.com/upper/age")),
                (
                    "object",
                    Term::typed_literal("4", "http://www.w3.org/2001/XMLSchema#int"),
                ),
            ]),
        ];
        let grouped = group_predicates(&rows, &mut ctx);
        assert_eq!(
            grouped,
            vec![
                ("upper:name".to_string(), json!(["Flipper", "Flip"])),
                ("upper:age".to_string(), json!(4)),
            ]
        );
    }

    #[test]
    fn super_property_repeating_sub_property_is_dropped() {
        let registry = PrefixRegistry::new();
        let mut ctx = Context::new(&registry, None);
        let sub = "http://semantica.globo.com/upper/fullName";
        let sup = "http://semantica.globo.com/upper/name";
        let rows = vec![
            row(&[
                ("predicate", Term::uri(sub)),
                ("object", Term::literal("Flipper")),
                ("super_property", Term::uri(sup)),
            ]),
            row(&[("predicate", Term::uri(sup)), ("object", Term::literal("Flipper"))]),
        ];
        let grouped = group_predicates(&rows, &mut ctx);
        assert_eq!(grouped, vec![("upper:fullName".to_string(), json!("Flipper"))]);
    }

    #[test]
    fn label_is_a_single_language_literal() {
        let registry = PrefixRegistry::new();
        let rows = vec![
            row(&[
                ("predicate", Term::uri(RDFS_LABEL)),
                ("object", Term::literal("Flipper")),
            ]),
            row(&[
                ("predicate", Term::uri(RDFS_LABEL)),
                ("object", Term::lang_literal("Pessoa", "pt")),
            ]),
            row(&[
                ("predicate", Term::uri(RDFS_LABEL)),
                ("object", Term::lang_literal("Person", "en")),
            ]),
        ];

        let mut ctx = Context::new(&registry, Some("pt"));
        assert_eq!(
            group_predicates(&rows, &mut ctx),
            vec![("rdfs:label".to_string(), json!("Pessoa"))]
        );

        let mut ctx = Context::new(&registry, None);
        assert_eq!(
            group_predicates(&rows, &mut ctx),
            vec![("rdfs:label".to_string(), json!("Flipper"))]
        );
    }

    #[test]
    fn typed_values() {
        let xsd = "http://www.w3.org/2001/XMLSchema#";
        assert_eq!(typed_value("4", &format!("{}integer", xsd)), json!(4));
        assert_eq!(typed_value("1.5", &format!("{}double", xsd)), json!(1.5));
        assert_eq!(typed_value("true", &format!("{}boolean", xsd)), json!(true));
        assert_eq!(typed_value("x", &format!("{}integer", xsd)), json!("x"));
        assert_eq!(typed_value("2013-01-01", &format!("{}date", xsd)), json!("2013-01-01"));
    }

    #[test]
    fn object_filter_prefers_iris() {
        let registry = PrefixRegistry::new();
        assert_eq!(
            object_filter("upper:Male", &registry),
            Object::Iri(iri("http://semantica.globo.com/upper/Male"))
        );
        assert_eq!(object_filter("Flipper", &registry), Object::plain("Flipper"));
        assert_eq!(object_filter("4", &registry), Object::plain("4"));
    }

    #[test]
    fn triples_follow_property_kinds() {
        let registry = PrefixRegistry::new();
        let ctx = Context::new(&registry, None);
        let instance = iri("http://semantica.globo.com/person/Person/1");
        let class = iri("http://semantica.globo.com/person/Person");
        let body = json!({
            "@context": {"upper": "http://semantica.globo.com/upper/"},
            "rdfs:label": "Flipper",
            "upper:name": ["Flipper", "Flip"],
            "upper:age": 4,
            "upper:gender": "upper:Male",
            "title": "ignored"
        });
        let triples = build_triples(
            &instance,
            &class,
            body.as_object().unwrap(),
            &person_schema(),
            &ctx,
        )
        .unwrap();
        let lines: Vec<String> = triples.iter().map(|t| t.to_string()).collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(
            lines[0],
            "<http://semantica.globo.com/person/Person/1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://semantica.globo.com/person/Person> ."
        );
        assert!(lines.iter().any(|l| l.ends_with(
            "<http://semantica.globo.com/upper/age> \"4\"^^<http://www.w3.org/2001/XMLSchema#int> ."
        )));
        assert!(lines.iter().any(|l| l.ends_with(
            "<http://semantica.globo.com/upper/gender> <http://semantica.globo.com/upper/Male> ."
        )));
        assert!(lines
            .iter()
            .any(|l| l.ends_with("<http://www.w3.org/2000/01/rdf-schema#label> \"Flipper\" .")));
    }

    #[test]
    fn unknown_predicate_and_missing_label_are_rejected() {
        let registry = PrefixRegistry::new();
        let ctx = Context::new(&registry, None);
        let instance = iri("http://semantica.globo.com/person/Person/1");
        let class = iri("http://semantica.globo.com/person/Person");

        let unknown = json!({"rdfs:label": "Flipper", "upper:wingspan": 3});
        let err = build_triples(
            &instance,
            &class,
            unknown.as_object().unwrap(),
            &person_schema(),
            &ctx,
        )
        .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("upper:wingspan"));

        let unlabelled = json!({"upper:age": 4});
        let err = build_triples(
            &instance,
            &class,
            unlabelled.as_object().unwrap(),
            &person_schema(),
            &ctx,
        )
        .unwrap_err();
        assert!(err.to_string().contains("rdfs:label"));
    }

    #[test]
    fn object_property_rejects_non_strings() {
        let registry = PrefixRegistry::new();
        let ctx = Context::new(&registry, None);
        let err = ValueKind::Iri.object("upper:gender", &json!(3), &ctx).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn prefix_names() {
        assert!(is_prefix_name("ex"));
        assert!(is_prefix_name("my_prefix-2"));
        assert!(!is_prefix_name("2ex"));
        assert!(!is_prefix_name("ex: <x> DROP"));
        assert!(!is_prefix_name(""));
    }
}
