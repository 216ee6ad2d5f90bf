//! OWL cardinality restrictions and `owl:oneOf` enumerations.
//!
//! The cardinality query returns one flattened row per restriction, range and
//! enumeration list node. This module folds those rows back into one
//! [`Restriction`] per `(predicate, range)`.
//!
//! Enumeration order: when the rows carry `list_node`/`next_node` (the
//! `rdf:rest` link) the RDF list is chased from its head. If the chain is
//! incomplete, values keep the order in which the endpoint returned them,
//! which is not guaranteed to be stable across endpoints.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::interpret::best_literal;
use crate::sparql::{Row, Term};

/// Range key for restrictions that do not name a range.
///
/// Such a restriction applies to whatever range the predicate declares.
pub const ANY_RANGE: &str = "";

const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";

/// One member of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumOption {
    pub value: String,
    pub label: Option<String>,
}

/// Cardinality and enumeration constraints for one `(predicate, range)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Restriction {
    pub min: Option<u64>,
    pub max: Option<u64>,
    /// Empty when the range is not an enumeration.
    pub options: Vec<EnumOption>,
}

impl Restriction {
    pub fn is_required(&self) -> bool {
        self.min.is_some_and(|min| min > 0)
    }
}

/// predicate URI -> range URI -> restriction.
pub type Cardinalities = BTreeMap<String, BTreeMap<String, Restriction>>;

/// Look up the restriction for a predicate with a declared range, falling
/// back to a range-less restriction on the same predicate.
pub fn restriction_for<'a>(
    cardinalities: &'a Cardinalities,
    predicate: &str,
    range: &str,
) -> Option<&'a Restriction> {
    let by_range = cardinalities.get(predicate)?;
    by_range.get(range).or_else(|| by_range.get(ANY_RANGE))
}

#[derive(Default)]
struct Group<'a> {
    min: Option<u64>,
    max: Option<u64>,
    // value -> labels, in first-seen order of values
    values: Vec<(&'a str, Vec<&'a Term>)>,
    // list node -> value, list node -> next node
    node_value: HashMap<&'a str, &'a str>,
    next: HashMap<&'a str, &'a str>,
}

/// Build the restriction table from cardinality-query rows.
///
/// Rows without a `predicate` are ignored; rows without an
/// `enumerated_value` contribute only `min`/`max`.
pub fn synthesize(rows: &[Row], lang: Option<&str>) -> Cardinalities {
    let mut groups: BTreeMap<(&str, &str), Group<'_>> = BTreeMap::new();

    for row in rows {
        let Some(predicate) = row.value("predicate") else {
            continue;
        };
        let range = row.value("range").unwrap_or(ANY_RANGE);
        let group = groups.entry((predicate, range)).or_default();

        if group.min.is_none() {
            group.min = parse_count(row.get("min"));
        }
        if group.max.is_none() {
            group.max = parse_count(row.get("max"));
        }

        let Some(value) = row.value("enumerated_value") else {
            continue;
        };
        match group.values.iter_mut().find(|(v, _)| *v == value) {
            Some((_, labels)) => labels.push(row.get("enumerated_value_label")),
            None => group
                .values
                .push((value, vec![row.get("enumerated_value_label")])),
        }
        if let Some(node) = row.value("list_node") {
            group.node_value.insert(node, value);
            if let Some(next) = row.value("next_node") {
                group.next.insert(node, next);
            }
        }
    }

    let mut table = Cardinalities::new();
    for ((predicate, range), group) in groups {
        let order = chase_list(&group).unwrap_or_else(|| {
            group.values.iter().map(|(value, _)| *value).collect()
        });
        let options = order
            .into_iter()
            .map(|value| {
                let label = group
                    .values
                    .iter()
                    .find(|(v, _)| *v == value)
                    .and_then(|(_, labels)| best_literal(labels.iter().copied(), lang))
                    .map(str::to_string);
                EnumOption {
                    value: value.to_string(),
                    label,
                }
            })
            .collect();

        table.entry(predicate.to_string()).or_default().insert(
            range.to_string(),
            Restriction {
                min: group.min,
                max: group.max,
                options,
            },
        );
    }
    table
}

fn parse_count(term: &Term) -> Option<u64> {
    term.value().and_then(|v| v.trim().parse().ok())
}

/// Order enumeration values by walking `rdf:rest` from the list head.
///
/// Returns `None` unless the walk reaches every value exactly once.
fn chase_list<'a>(group: &Group<'a>) -> Option<Vec<&'a str>> {
    if group.values.is_empty() || group.node_value.is_empty() {
        return None;
    }
    let targets: HashSet<&str> = group.next.values().copied().collect();
    let mut heads = group
        .node_value
        .keys()
        .copied()
        .filter(|node| !targets.contains(node));
    let head = heads.next()?;
    if heads.next().is_some() {
        return None;
    }

    let mut ordered = Vec::new();
    let mut seen = HashSet::new();
    let mut node = head;
    loop {
        if !seen.insert(node) {
            return None;
        }
        let value = group.node_value.get(node)?;
        if !ordered.contains(value) {
            ordered.push(*value);
        }
        match group.next.get(node) {
            Some(next) if *next != RDF_NIL && group.node_value.contains_key(next) => node = *next,
            _ => break,
        }
    }

    (ordered.len() == group.values.len()).then_some(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: &str = "http://example.org/gender";
    const R: &str = "nodeID://b100";

    fn row(pairs: &[(&str, Term)]) -> Row {
        pairs.iter().cloned().collect()
    }

    fn enum_row(node: &str, next: &str, value: &str, label: &str) -> Row {
        row(&[
            ("predicate", Term::uri(P)),
            ("range", Term::BlankNode(R.into())),
            ("list_node", Term::BlankNode(node.into())),
            ("next_node", Term::uri(next)),
            ("enumerated_value", Term::uri(value)),
            ("enumerated_value_label", Term::lang_literal(label, "pt")),
        ])
    }

    #[test]
    fn min_and_max_taken_from_first_bound_row() {
        let rows = vec![
            row(&[
                ("predicate", Term::uri(P)),
                ("range", Term::uri("http://example.org/Gender")),
                ("min", Term::typed_literal("1", "xsd:nonNegativeInteger")),
            ]),
            row(&[
                ("predicate", Term::uri(P)),
                ("range", Term::uri("http://example.org/Gender")),
                ("max", Term::literal("1")),
                ("min", Term::literal("7")),
            ]),
        ];
        let table = synthesize(&rows, None);
        let restriction = &table[P]["http://example.org/Gender"];
        assert_eq!(restriction.min, Some(1));
        assert_eq!(restriction.max, Some(1));
        assert!(restriction.options.is_empty());
        assert!(restriction.is_required());
    }

    #[test]
    fn enumeration_follows_rdf_rest_chain() {
        // Returned out of list order on purpose
        let rows = vec![
            enum_row("nodeID://n3", RDF_NIL, "http://example.org/Other", "Outro"),
            enum_row("nodeID://n1", "nodeID://n2", "http://example.org/Male", "Masculino"),
            enum_row("nodeID://n2", "nodeID://n3", "http://example.org/Female", "Feminino"),
        ];
        let table = synthesize(&rows, Some("pt"));
        let options = &table[P][R].options;
        let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(
            values,
            vec![
                "http://example.org/Male",
                "http://example.org/Female",
                "http://example.org/Other"
            ]
        );
        assert_eq!(options[0].label.as_deref(), Some("Masculino"));
    }

    #[test]
    fn broken_chain_keeps_return_order() {
        let rows = vec![
            row(&[
                ("predicate", Term::uri(P)),
                ("range", Term::BlankNode(R.into())),
                ("enumerated_value", Term::uri("http://example.org/B")),
            ]),
            row(&[
                ("predicate", Term::uri(P)),
                ("range", Term::BlankNode(R.into())),
                ("enumerated_value", Term::uri("http://example.org/A")),
            ]),
        ];
        let table = synthesize(&rows, None);
        let values: Vec<&str> = table[P][R].options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["http://example.org/B", "http://example.org/A"]);
    }

    #[test]
    fn labels_follow_requested_language() {
        let rows = vec![
            row(&[
                ("predicate", Term::uri(P)),
                ("range", Term::BlankNode(R.into())),
                ("enumerated_value", Term::uri("http://example.org/Male")),
                ("enumerated_value_label", Term::lang_literal("Male", "en")),
            ]),
            row(&[
                ("predicate", Term::uri(P)),
                ("range", Term::BlankNode(R.into())),
                ("enumerated_value", Term::uri("http://example.org/Male")),
                ("enumerated_value_label", Term::lang_literal("Masculino", "pt")),
            ]),
        ];
        let table = synthesize(&rows, Some("en"));
        let options = &table[P][R].options;
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].label.as_deref(), Some("Male"));
    }

    #[test]
    fn each_range_gets_its_own_restriction() {
        let rows = vec![
            row(&[
                ("predicate", Term::uri(P)),
                ("range", Term::uri("http://example.org/A")),
                ("min", Term::literal("1")),
            ]),
            row(&[
                ("predicate", Term::uri(P)),
                ("range", Term::uri("http://example.org/B")),
                ("max", Term::literal("3")),
            ]),
        ];
        let table = synthesize(&rows, None);
        assert_eq!(table[P].len(), 2);
        assert_eq!(
            restriction_for(&table, P, "http://example.org/B").and_then(|r| r.max),
            Some(3)
        );
        assert!(restriction_for(&table, P, "http://example.org/C").is_none());
    }

    #[test]
    fn rangeless_restriction_applies_to_any_range() {
        let rows = vec![row(&[("predicate", Term::uri(P)), ("max", Term::literal("1"))])];
        let table = synthesize(&rows, None);
        let restriction = restriction_for(&table, P, "http://example.org/Whatever").unwrap();
        assert_eq!(restriction.max, Some(1));
    }

    #[test]
    fn rows_without_predicate_are_ignored() {
        let rows = vec![row(&[("min", Term::literal("1"))])];
        assert!(synthesize(&rows, None).is_empty());
    }
}
