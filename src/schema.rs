//! Per-predicate JSON-Schema fragments.
//!
//! Predicate rows (one per predicate, range, label language, ...) are grouped
//! into [`PredicateDescriptor`]s, restrictions from the cardinality table are
//! merged in, and inherited predicates made redundant by a more specific
//! sub-property are removed.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Map, Value};

use crate::cardinality::{restriction_for, Cardinalities, Restriction};
use crate::interpret::best_literal;
use crate::prefixes::Context;
use crate::sparql::{Row, Term};

const OWL_OBJECT_PROPERTY: &str = "http://www.w3.org/2002/07/owl#ObjectProperty";
const OWL_DATATYPE_PROPERTY: &str = "http://www.w3.org/2002/07/owl#DatatypeProperty";
const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateKind {
    Object,
    Datatype,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeInfo {
    pub uri: String,
    pub graph: Option<String>,
    pub label: Option<String>,
}

/// One property of a class, folded from all rows naming it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateDescriptor {
    pub predicate: String,
    pub kind: PredicateKind,
    /// Declared ranges in first-seen order.
    pub ranges: Vec<RangeInfo>,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub super_properties: Vec<String>,
    pub graph: Option<String>,
}

impl PredicateDescriptor {
    fn range_set(&self) -> BTreeSet<&str> {
        self.ranges.iter().map(|r| r.uri.as_str()).collect()
    }
}

/// Output of [`build`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySchema {
    /// Predicate CURIE -> property descriptor.
    pub properties: Map<String, Value>,
    /// CURIEs of predicates with a minimum cardinality above zero.
    pub required: Vec<String>,
}

/// JSON type stanza for an XSD datatype. Unknown datatypes map to `string`.
pub fn xsd_to_json(datatype: &str) -> Map<String, Value> {
    let local = datatype
        .strip_prefix(XSD)
        .or_else(|| datatype.strip_prefix("xsd:"))
        .unwrap_or(datatype);
    let stanza = match local {
        "date" => json!({"type": "string", "format": "date"}),
        "dateTime" => json!({"type": "string", "format": "date-time"}),
        "time" => json!({"type": "string", "format": "time"}),
        "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger"
        | "positiveInteger" | "negativeInteger" | "nonPositiveInteger" | "unsignedInt"
        | "unsignedLong" => json!({"type": "integer"}),
        "float" | "double" | "decimal" => json!({"type": "number"}),
        "boolean" => json!({"type": "boolean"}),
        _ => json!({"type": "string"}),
    };
    match stanza {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Group predicate-query rows by predicate, preserving first-seen order.
pub fn collect_predicates(rows: &[Row], lang: Option<&str>) -> Vec<PredicateDescriptor> {
    struct Acc<'a> {
        predicate: &'a str,
        types: BTreeSet<&'a str>,
        ranges: Vec<(&'a str, Option<&'a str>, Vec<&'a Term>)>,
        titles: Vec<&'a Term>,
        comments: Vec<&'a Term>,
        super_properties: Vec<&'a str>,
        graph: Option<&'a str>,
    }

    let mut accs: Vec<Acc<'_>> = Vec::new();
    for row in rows {
        let Some(predicate) = row.value("predicate") else {
            continue;
        };
        let idx = match accs.iter().position(|a| a.predicate == predicate) {
            Some(idx) => idx,
            None => {
                accs.push(Acc {
                    predicate,
                    types: BTreeSet::new(),
                    ranges: Vec::new(),
                    titles: Vec::new(),
                    comments: Vec::new(),
                    super_properties: Vec::new(),
                    graph: None,
                });
                accs.len() - 1
            }
        };
        let acc = &mut accs[idx];

        if let Some(t) = row.value("type") {
            acc.types.insert(t);
        }
        if let Some(range) = row.value("range") {
            let label = row.get("range_label");
            match acc.ranges.iter_mut().find(|(uri, _, _)| *uri == range) {
                Some((_, graph, labels)) => {
                    if graph.is_none() {
                        *graph = row.value("range_graph");
                    }
                    labels.push(label);
                }
                None => acc.ranges.push((range, row.value("range_graph"), vec![label])),
            }
        }
        acc.titles.push(row.get("title"));
        acc.comments.push(row.get("predicate_comment"));
        if let Some(sp) = row.value("super_property") {
            if sp != predicate && !acc.super_properties.contains(&sp) {
                acc.super_properties.push(sp);
            }
        }
        if acc.graph.is_none() {
            acc.graph = row.value("predicate_graph");
        }
    }

    accs.into_iter()
        .map(|acc| {
            let kind = if acc.types.contains(OWL_OBJECT_PROPERTY) {
                PredicateKind::Object
            } else if acc.types.contains(OWL_DATATYPE_PROPERTY)
                || acc.ranges.iter().any(|(uri, _, _)| uri.starts_with(XSD))
            {
                PredicateKind::Datatype
            } else {
                PredicateKind::Object
            };
            PredicateDescriptor {
                predicate: acc.predicate.to_string(),
                kind,
                ranges: acc
                    .ranges
                    .into_iter()
                    .map(|(uri, graph, labels)| RangeInfo {
                        uri: uri.to_string(),
                        graph: graph.map(str::to_string),
                        label: best_literal(labels, lang).map(str::to_string),
                    })
                    .collect(),
                title: best_literal(acc.titles, lang).map(str::to_string),
                comment: best_literal(acc.comments, lang).map(str::to_string),
                super_properties: acc.super_properties.into_iter().map(str::to_string).collect(),
                graph: acc.graph.map(str::to_string),
            }
        })
        .collect()
}

/// Drop predicates that are the super-property of another predicate with the
/// same range set.
pub fn remove_redundant(descriptors: Vec<PredicateDescriptor>) -> Vec<PredicateDescriptor> {
    // First pass: predicate -> ranges
    let ranges: BTreeMap<&str, BTreeSet<&str>> = descriptors
        .iter()
        .map(|d| (d.predicate.as_str(), d.range_set()))
        .collect();

    let redundant: BTreeSet<String> = descriptors
        .iter()
        .flat_map(|sub| {
            let sub_ranges = &ranges[sub.predicate.as_str()];
            sub.super_properties
                .iter()
                .filter(|sup| ranges.get(sup.as_str()) == Some(sub_ranges))
                .cloned()
                .collect::<Vec<_>>()
        })
        .collect();

    // Second pass: filter
    descriptors
        .into_iter()
        .filter(|d| !redundant.contains(&d.predicate))
        .collect()
}

/// Build the `properties` section of a class schema.
pub fn build(
    rows: &[Row],
    cardinalities: &Cardinalities,
    lang: Option<&str>,
    ctx: &mut Context<'_>,
) -> PropertySchema {
    let descriptors = remove_redundant(collect_predicates(rows, lang));
    let mut schema = PropertySchema::default();

    for descriptor in &descriptors {
        let key = ctx.shorten(&descriptor.predicate);
        let restriction = descriptor
            .ranges
            .iter()
            .find_map(|r| restriction_for(cardinalities, &descriptor.predicate, &r.uri));
        if restriction.is_some_and(Restriction::is_required) {
            schema.required.push(key.clone());
        }
        let property = describe(descriptor, restriction, ctx);
        schema.properties.insert(key, Value::Object(property));
    }
    schema
}

fn describe(
    descriptor: &PredicateDescriptor,
    restriction: Option<&Restriction>,
    ctx: &mut Context<'_>,
) -> Map<String, Value> {
    let mut property = match descriptor.kind {
        PredicateKind::Object => {
            let mut stanza = Map::new();
            stanza.insert("type".into(), json!("string"));
            stanza.insert("format".into(), json!("uri"));
            let ranges: Vec<Value> = descriptor
                .ranges
                .iter()
                .map(|r| range_object(r, ctx))
                .collect();
            match ranges.len() {
                0 => {}
                1 => {
                    stanza.insert("range".into(), ranges.into_iter().next().unwrap_or_default());
                }
                _ => {
                    stanza.insert("range".into(), Value::Array(ranges));
                }
            }
            stanza
        }
        PredicateKind::Datatype => {
            // Multiple datatype ranges: the first declared one wins
            let datatype = descriptor.ranges.first().map(|r| r.uri.as_str());
            let mut stanza = xsd_to_json(datatype.unwrap_or_default());
            if let Some(datatype) = datatype {
                stanza.insert("datatype".into(), json!(ctx.shorten(datatype)));
            }
            stanza
        }
    };

    if let Some(restriction) = restriction {
        if let Some(min) = restriction.min {
            property.insert("min".into(), json!(min));
        }
        if let Some(max) = restriction.max {
            property.insert("max".into(), json!(max));
        }
        if !restriction.options.is_empty() {
            let values: Vec<Value> = restriction
                .options
                .iter()
                .map(|o| json!(ctx.shorten(&o.value)))
                .collect();
            let options: Vec<Value> = restriction
                .options
                .iter()
                .zip(&values)
                .map(|(o, v)| match &o.label {
                    Some(label) => json!({"value": v, "label": label}),
                    None => json!({"value": v}),
                })
                .collect();
            property.insert("enum".into(), Value::Array(values));
            property.insert("options".into(), Value::Array(options));
        }
    }

    if let Some(title) = &descriptor.title {
        property.insert("title".into(), json!(title));
    }
    if let Some(graph) = &descriptor.graph {
        property.insert("graph".into(), json!(ctx.registry().slug(graph)));
    }
    if let Some(comment) = &descriptor.comment {
        property.insert("comment".into(), json!(comment));
    }
    property
}

fn range_object(range: &RangeInfo, ctx: &mut Context<'_>) -> Value {
    let mut object = Map::new();
    object.insert("@id".into(), json!(ctx.shorten(&range.uri)));
    if let Some(graph) = &range.graph {
        object.insert("graph".into(), json!(ctx.registry().slug(graph)));
    }
    if let Some(label) = &range.label {
        object.insert("title".into(), json!(label));
    }
    Value::Object(object)
}
