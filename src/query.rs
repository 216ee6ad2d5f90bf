//! SPARQL query composition.
//!
//! Every query is a fixed template. User-supplied IRIs only reach a template
//! as [`SparqlIri`] (validated on construction) and literals always pass
//! through [`escape_literal`], so composing a query cannot fail.

use std::fmt;

use crate::error::ApiError;

/// An IRI that is safe to place between `<` and `>` in a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SparqlIri(String);

impl SparqlIri {
    /// # Errors
    ///
    /// Returns the parser's message when `iri` is not an absolute IRI.
    pub fn parse(iri: &str) -> Result<Self, String> {
        oxiri::Iri::parse(iri).map_err(|e| e.to_string())?;
        Ok(Self(iri.to_string()))
    }

    /// Parse a request parameter, reporting failures as `InvalidParameter`.
    pub fn param(name: &str, iri: &str) -> Result<Self, ApiError> {
        Self::parse(iri).map_err(|reason| ApiError::InvalidParameter {
            name: name.to_string(),
            value: iri.to_string(),
            reason,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `self` followed by `suffix`, re-validated.
    pub fn join(&self, suffix: &str) -> Result<Self, String> {
        Self::parse(&format!("{}{}", self.0, suffix))
    }
}

impl fmt::Display for SparqlIri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// Escape a string for use inside a double-quoted SPARQL literal.
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Object position of a triple or filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Iri(SparqlIri),
    Literal {
        value: String,
        datatype: Option<SparqlIri>,
        lang: Option<String>,
    },
}

impl Object {
    pub fn plain(value: impl Into<String>) -> Self {
        Object::Literal {
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Iri(iri) => write!(f, "{}", iri),
            Object::Literal {
                value,
                datatype: Some(datatype),
                ..
            } => write!(f, "\"{}\"^^{}", escape_literal(value), datatype),
            Object::Literal {
                value,
                lang: Some(lang),
                ..
            } => write!(f, "\"{}\"@{}", escape_literal(value), escape_literal(lang)),
            Object::Literal { value, .. } => write!(f, "\"{}\"", escape_literal(value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: SparqlIri,
    pub predicate: SparqlIri,
    pub object: Object,
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Parameters of the instance listing query.
#[derive(Debug, Clone)]
pub struct InstanceListing<'a> {
    pub graph: &'a SparqlIri,
    pub class: &'a SparqlIri,
    pub lang: Option<&'a str>,
    pub predicate: Option<&'a SparqlIri>,
    pub object: Option<&'a Object>,
    pub sort_by: Option<(&'a SparqlIri, SortOrder)>,
}

/// `FILTER` restricting `var` to `lang` or untagged literals; empty without a language.
pub fn lang_filter(var: &str, lang: Option<&str>) -> String {
    match lang {
        Some(lang) => format!(
            "FILTER(langMatches(lang(?{var}), \"{lang}\") OR langMatches(lang(?{var}), \"\")) .",
            var = var,
            lang = escape_literal(lang)
        ),
        None => String::new(),
    }
}

/// Builds the query strings of the pipeline.
#[derive(Debug, Clone)]
pub struct QueryComposer {
    ruleset: SparqlIri,
}

impl QueryComposer {
    pub fn new(ruleset: SparqlIri) -> Self {
        Self { ruleset }
    }

    fn inference(&self) -> String {
        format!("DEFINE input:inference {}", self.ruleset)
    }

    pub fn list_classes(
        &self,
        graph: &SparqlIri,
        lang: Option<&str>,
        per_page: u64,
        offset: u64,
    ) -> String {
        format!(
            "SELECT DISTINCT ?class ?label\n\
             FROM {graph}\n\
             {{\n    ?class a owl:Class ;\n           rdfs:label ?label .\n    {filter}\n}}\n\
             LIMIT {per_page}\nOFFSET {offset}",
            graph = graph,
            filter = lang_filter("label", lang),
            per_page = per_page,
            offset = offset
        )
    }

    pub fn count_classes(&self, graph: &SparqlIri, lang: Option<&str>) -> String {
        format!(
            "SELECT COUNT(DISTINCT ?class) AS ?total_items\n\
             FROM {graph}\n\
             {{\n    ?class a owl:Class ;\n           rdfs:label ?label .\n    {filter}\n}}",
            graph = graph,
            filter = lang_filter("label", lang)
        )
    }

    pub fn graph_exists(&self, graph: &SparqlIri) -> String {
        format!("ASK {{GRAPH {} {{?s ?p ?o}}}}", graph)
    }

    pub fn class_exists(&self, graph: &SparqlIri, class: &SparqlIri) -> String {
        format!("ASK FROM {} {{{} a owl:Class}}", graph, class)
    }

    /// Label and comment of a class, from the graph defining it.
    pub fn class_info(&self, graph: &SparqlIri, class: &SparqlIri, lang: Option<&str>) -> String {
        format!(
            "SELECT DISTINCT ?title ?comment\n\
             WHERE {{\n    GRAPH {graph} {{\n        {class} a owl:Class ;\n                rdfs:label ?title .\n        {filter}\n        OPTIONAL {{ {class} rdfs:comment ?comment . {comment_filter} }}\n    }}\n}}",
            graph = graph,
            class = class,
            filter = lang_filter("title", lang),
            comment_filter = lang_filter("comment", lang)
        )
    }

    pub fn list_contexts(&self) -> String {
        "SELECT DISTINCT ?graph WHERE {GRAPH ?graph {?s ?p ?o}}".to_string()
    }

    /// Every predicate/object of an instance, with inferred super-properties.
    pub fn instance(&self, class: &SparqlIri, instance: &SparqlIri, lang: Option<&str>) -> String {
        let object_filter = match lang {
            Some(lang) => format!(
                "FILTER((langMatches(lang(?object), \"{lang}\") OR langMatches(lang(?object), \"\")) OR isURI(?object)) .",
                lang = escape_literal(lang)
            ),
            None => String::new(),
        };
        format!(
            "{inference}\n\
             SELECT DISTINCT ?predicate ?object ?label ?super_property\n\
             WHERE {{\n    {instance} a {class} ;\n        rdfs:label ?label ;\n        ?predicate ?object .\n    OPTIONAL {{ ?predicate rdfs:subPropertyOf ?super_property }} .\n    {object_filter}\n}}",
            inference = self.inference(),
            instance = instance,
            class = class,
            object_filter = object_filter
        )
    }

    pub fn instance_exists(&self, graph: &SparqlIri, instance: &SparqlIri) -> String {
        format!("ASK FROM {} {{{} ?p ?o}}", graph, instance)
    }

    fn listing_pattern(&self, listing: &InstanceListing<'_>) -> String {
        let mut pattern = format!(
            "    ?subject a {class} ;\n             rdfs:label ?label .\n    {filter}\n",
            class = listing.class,
            filter = lang_filter("label", listing.lang)
        );
        match (listing.predicate, listing.object) {
            (Some(p), Some(o)) => pattern.push_str(&format!("    ?subject {} {} .\n", p, o)),
            (Some(p), None) => pattern.push_str(&format!("    ?subject {} ?object .\n", p)),
            (None, Some(o)) => pattern.push_str(&format!("    ?subject ?predicate {} .\n", o)),
            (None, None) => {}
        }
        if let Some((sort_by, _)) = listing.sort_by {
            pattern.push_str(&format!(
                "    OPTIONAL {{ ?subject {} ?sort_object }} .\n",
                sort_by
            ));
        }
        pattern
    }

    pub fn list_instances(
        &self,
        listing: &InstanceListing<'_>,
        per_page: u64,
        offset: u64,
    ) -> String {
        let (sort_var, order_by) = match listing.sort_by {
            Some((_, order)) => (
                " ?sort_object",
                format!("ORDER BY {}(?sort_object)\n", order.keyword()),
            ),
            None => ("", String::new()),
        };
        format!(
            "{inference}\n\
             SELECT DISTINCT ?subject ?label{sort_var}\n\
             FROM {graph}\n\
             WHERE {{\n{pattern}}}\n\
             {order_by}LIMIT {per_page}\nOFFSET {offset}",
            inference = self.inference(),
            sort_var = sort_var,
            graph = listing.graph,
            pattern = self.listing_pattern(listing),
            order_by = order_by,
            per_page = per_page,
            offset = offset
        )
    }

    pub fn count_instances(&self, listing: &InstanceListing<'_>) -> String {
        format!(
            "{inference}\n\
             SELECT COUNT(DISTINCT ?subject) AS ?total_items\n\
             FROM {graph}\n\
             WHERE {{\n{pattern}}}",
            inference = self.inference(),
            graph = listing.graph,
            pattern = self.listing_pattern(listing)
        )
    }

    pub fn insert_instance(
        &self,
        graph: &SparqlIri,
        prefixes: &[(String, SparqlIri)],
        triples: &[Triple],
    ) -> String {
        format!(
            "{prefixes}INSERT DATA INTO {graph} {{\n{triples}}}",
            prefixes = prefix_lines(prefixes),
            graph = graph,
            triples = triple_lines(triples)
        )
    }

    /// Replace every predicate of `instance` with `triples`.
    pub fn modify_instance(
        &self,
        graph: &SparqlIri,
        instance: &SparqlIri,
        prefixes: &[(String, SparqlIri)],
        triples: &[Triple],
    ) -> String {
        format!(
            "{prefixes}MODIFY GRAPH {graph}\n\
             DELETE {{ {instance} ?predicate ?old_value }}\n\
             INSERT {{\n{triples}}}\n\
             WHERE {{ {instance} ?predicate ?old_value }}",
            prefixes = prefix_lines(prefixes),
            graph = graph,
            instance = instance,
            triples = triple_lines(triples)
        )
    }

    pub fn delete_instance(&self, graph: &SparqlIri, instance: &SparqlIri) -> String {
        format!(
            "DELETE FROM {graph} {{ {instance} ?p ?o }}\nWHERE {{ {instance} ?p ?o }}",
            graph = graph,
            instance = instance
        )
    }

    /// Predicates applicable to `class`, walking `rdfs:subClassOf` transitively.
    ///
    /// With `lang` set, labels and comments are language filtered; callers retry
    /// with `None` when the filtered variant returns nothing.
    pub fn predicates(&self, class: &SparqlIri, lang: Option<&str>) -> String {
        format!(
            "{inference}\n\
             SELECT DISTINCT ?predicate ?predicate_graph ?predicate_comment ?type ?range ?title ?range_graph ?range_label ?super_property ?domain_class\n\
             WHERE {{\n\
             \x20   {{\n\
             \x20       GRAPH ?predicate_graph {{ ?predicate rdfs:domain ?domain_class }} .\n\
             \x20       {class} rdfs:subClassOf ?domain_class OPTION (TRANSITIVE, t_distinct, t_min(0)) .\n\
             \x20   }}\n\
             \x20   UNION {{\n\
             \x20       GRAPH ?predicate_graph {{ ?predicate rdfs:domain ?union_domain }} .\n\
             \x20       ?union_domain a owl:Class ; owl:unionOf ?domains .\n\
             \x20       OPTIONAL {{ ?domains rdf:rest ?domain_node OPTION (TRANSITIVE, t_min(0)) }} .\n\
             \x20       OPTIONAL {{ ?domain_node rdf:first ?domain_class }} .\n\
             \x20       {class} rdfs:subClassOf ?domain_class OPTION (TRANSITIVE, t_distinct, t_min(0)) .\n\
             \x20   }}\n\
             \x20   {{ ?predicate rdfs:range ?range . }}\n\
             \x20   UNION {{\n\
             \x20       ?predicate rdfs:range ?union_range .\n\
             \x20       ?union_range a owl:Class ; owl:unionOf ?ranges .\n\
             \x20       OPTIONAL {{ ?ranges rdf:rest ?range_node OPTION (TRANSITIVE, t_min(0)) }} .\n\
             \x20       OPTIONAL {{ ?range_node rdf:first ?range }} .\n\
             \x20   }}\n\
             \x20   FILTER (!isBlank(?range)) .\n\
             \x20   ?predicate rdfs:label ?title .\n\
             \x20   ?predicate rdf:type ?type .\n\
             \x20   FILTER (?type IN (owl:ObjectProperty, owl:DatatypeProperty)) .\n\
             \x20   {title_filter}\n\
             \x20   OPTIONAL {{ ?predicate rdfs:subPropertyOf ?super_property }} .\n\
             \x20   OPTIONAL {{ GRAPH ?range_graph {{ ?range rdfs:label ?range_label . {range_filter} }} }} .\n\
             \x20   OPTIONAL {{ ?predicate rdfs:comment ?predicate_comment . {comment_filter} }} .\n\
             }}",
            inference = self.inference(),
            class = class,
            title_filter = lang_filter("title", lang),
            range_filter = lang_filter("range_label", lang),
            comment_filter = lang_filter("predicate_comment", lang)
        )
    }

    /// Cardinality restrictions and `owl:oneOf` enumerations inherited by `class`.
    ///
    /// `?list_node`/`?next_node` expose the `rdf:rest` chain so enumeration
    /// order can be rebuilt.
    pub fn cardinalities(&self, class: &SparqlIri) -> String {
        format!(
            "{inference}\n\
             SELECT DISTINCT ?predicate ?min ?max ?range ?list_node ?next_node ?enumerated_value ?enumerated_value_label\n\
             WHERE {{\n\
             \x20   {class} rdfs:subClassOf ?restriction OPTION (TRANSITIVE, t_distinct, t_min(0)) .\n\
             \x20   ?restriction owl:onProperty ?predicate .\n\
             \x20   OPTIONAL {{ ?restriction owl:minQualifiedCardinality ?min }} .\n\
             \x20   OPTIONAL {{ ?restriction owl:maxQualifiedCardinality ?max }} .\n\
             \x20   OPTIONAL {{\n\
             \x20       {{ ?restriction owl:onClass ?range }}\n\
             \x20       UNION {{ ?restriction owl:onDataRange ?range }}\n\
             \x20       UNION {{ ?restriction owl:allValuesFrom ?range }} .\n\
             \x20       OPTIONAL {{ ?range owl:oneOf ?enumeration }} .\n\
             \x20       OPTIONAL {{ ?enumeration rdf:rest ?list_node OPTION (TRANSITIVE, t_min(0)) }} .\n\
             \x20       OPTIONAL {{ ?list_node rdf:first ?enumerated_value }} .\n\
             \x20       OPTIONAL {{ ?list_node rdf:rest ?next_node }} .\n\
             \x20       OPTIONAL {{ ?enumerated_value rdfs:label ?enumerated_value_label }} .\n\
             \x20   }}\n\
             }}",
            inference = self.inference(),
            class = class
        )
    }
}

fn prefix_lines(prefixes: &[(String, SparqlIri)]) -> String {
    prefixes
        .iter()
        .map(|(prefix, namespace)| format!("PREFIX {}: {}\n", prefix, namespace))
        .collect()
}

fn triple_lines(triples: &[Triple]) -> String {
    triples.iter().map(|t| format!("    {}\n", t)).collect()
}
