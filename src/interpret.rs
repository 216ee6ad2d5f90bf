//! Result interpretation: typed rows to compact JSON mappings.

use serde_json::{Map, Value};

use crate::prefixes::Context;
use crate::sparql::{Row, SparqlResponse, Term};

/// Flatten rows into one JSON object each.
///
/// Variables listed in `keymap` as `(variable, key)` are renamed. URI values
/// are shortened when a rendering `ctx` is supplied.
pub fn compress(
    rows: &[Row],
    keymap: &[(&str, &str)],
    mut ctx: Option<&mut Context<'_>>,
) -> Vec<Map<String, Value>> {
    rows.iter()
        .map(|row| {
            let mut item = Map::new();
            for (var, term) in row.iter() {
                let key = keymap
                    .iter()
                    .find(|(from, _)| *from == var)
                    .map(|(_, to)| *to)
                    .unwrap_or(var);
                let value = match (term, ctx.as_mut()) {
                    (Term::Uri(uri), Some(ctx)) => ctx.shorten(uri),
                    _ => match term.value() {
                        Some(v) => v.to_string(),
                        None => continue,
                    },
                };
                item.insert(key.to_string(), Value::String(value));
            }
            item
        })
        .collect()
}

/// Fold items sharing an `@id` into one item per id.
///
/// Every other key becomes the set of its distinct values, collapsed to a
/// scalar when only one value remains. Ids and values keep first-seen order.
pub fn dedupe_by_id(items: Vec<Map<String, Value>>) -> Vec<Map<String, Value>> {
    let mut order: Vec<Value> = Vec::new();
    let mut grouped: Vec<Map<String, Value>> = Vec::new();

    for item in items {
        let id = item.get("@id").cloned().unwrap_or(Value::Null);
        let idx = match order.iter().position(|seen| *seen == id) {
            Some(idx) => idx,
            None => {
                order.push(id.clone());
                let mut fresh = Map::new();
                fresh.insert("@id".to_string(), id);
                grouped.push(fresh);
                grouped.len() - 1
            }
        };
        let target = &mut grouped[idx];
        for (key, value) in item {
            if key == "@id" {
                continue;
            }
            let slot = target
                .entry(key)
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(values) = slot {
                let incoming = match value {
                    Value::Array(many) => many,
                    one => vec![one],
                };
                for v in incoming {
                    if !values.contains(&v) {
                        values.push(v);
                    }
                }
            }
        }
    }

    for item in &mut grouped {
        for value in item.values_mut() {
            if let Value::Array(values) = value {
                if values.len() == 1 {
                    *value = values.remove(0);
                }
            }
        }
    }
    grouped
}

/// True iff the response carries no rows.
pub fn is_empty(response: &SparqlResponse) -> bool {
    matches!(response, SparqlResponse::Select { rows, .. } if rows.is_empty())
}

/// Value of `key` in the first row, if bound.
pub fn get_single<'a>(rows: &'a [Row], key: &str) -> Option<&'a str> {
    rows.first().and_then(|row| row.value(key))
}

/// Last path segment or fragment of `uri`.
pub fn resource_id(uri: &str) -> &str {
    let trimmed = uri.trim_end_matches('/');
    trimmed
        .rsplit(|c| c == '/' || c == '#')
        .next()
        .unwrap_or(trimmed)
}

/// SPARQL `langMatches` for a plain language range (`""` matches untagged).
pub fn lang_matches(tag: Option<&str>, range: &str) -> bool {
    let tag = tag.unwrap_or("");
    if range.is_empty() {
        return tag.is_empty();
    }
    if range == "*" {
        return !tag.is_empty();
    }
    let tag = tag.to_ascii_lowercase();
    let range = range.to_ascii_lowercase();
    tag == range || tag.starts_with(&format!("{}-", range))
}

/// Pick the literal best suited to `lang`: an exact language match, then an
/// untagged literal, then whatever came first.
pub fn best_literal<'a, I>(terms: I, lang: Option<&str>) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a Term>,
{
    let terms: Vec<&'a Term> = terms.into_iter().filter(|t| t.is_bound()).collect();
    let matching =
        lang.and_then(|lang| terms.iter().copied().find(|t| lang_matches(t.lang(), lang)));
    matching
        .or_else(|| terms.iter().copied().find(|t| t.lang().is_none()))
        .or_else(|| terms.first().copied())
        .and_then(Term::value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefixes::PrefixRegistry;
    use serde_json::json;

    fn row(pairs: &[(&str, Term)]) -> Row {
        pairs.iter().cloned().collect()
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn compress_renames_and_shortens() {
        let registry = PrefixRegistry::new();
        let mut ctx = Context::new(&registry, None);
        let rows = vec![row(&[
            ("class", Term::uri("http://semantica.globo.com/upper/Person")),
            ("label", Term::lang_literal("Pessoa", "pt")),
        ])];

        let items = compress(&rows, &[("class", "@id"), ("label", "title")], Some(&mut ctx));
        assert_eq!(items, vec![obj(json!({"@id": "upper:Person", "title": "Pessoa"}))]);
        assert!(ctx.to_json().get("upper").is_some());
    }

    #[test]
    fn compress_without_context_keeps_full_uris() {
        let rows = vec![row(&[("s", Term::uri("http://semantica.globo.com/upper/Person"))])];
        let items = compress(&rows, &[], None);
        assert_eq!(items[0]["s"], "http://semantica.globo.com/upper/Person");
    }

    #[test]
    fn dedupe_merges_titles() {
        let items = vec![
            obj(json!({"@id": "x", "title": "Pessoa"})),
            obj(json!({"@id": "x", "title": "Person"})),
        ];
        let result = dedupe_by_id(items);
        assert_eq!(result.len(), 1);
        let mut titles: Vec<&str> = result[0]["title"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["Person", "Pessoa"]);
    }

    #[test]
    fn dedupe_collapses_repeated_values() {
        let items = vec![
            obj(json!({"@id": "a", "title": "A"})),
            obj(json!({"@id": "b", "title": "B"})),
            obj(json!({"@id": "a", "title": "A"})),
        ];
        let result = dedupe_by_id(items);
        assert_eq!(
            result,
            vec![
                obj(json!({"@id": "a", "title": "A"})),
                obj(json!({"@id": "b", "title": "B"}))
            ]
        );
    }

    #[test]
    fn emptiness_and_single_values() {
        let empty = SparqlResponse::Select {
            vars: vec!["x".into()],
            rows: vec![],
        };
        assert!(is_empty(&empty));
        assert!(!is_empty(&SparqlResponse::Ask(false)));

        let rows = vec![row(&[("total", Term::literal("12"))])];
        assert_eq!(get_single(&rows, "total"), Some("12"));
        assert_eq!(get_single(&rows, "missing"), None);
        assert_eq!(get_single(&[], "total"), None);
    }

    #[test]
    fn resource_ids() {
        assert_eq!(resource_id("http://semantica.globo.com/person/Person"), "Person");
        assert_eq!(resource_id("http://semantica.globo.com/person/"), "person");
        assert_eq!(resource_id("http://www.w3.org/2002/07/owl#Class"), "Class");
    }

    #[test]
    fn lang_matching() {
        assert!(lang_matches(Some("pt"), "pt"));
        assert!(lang_matches(Some("pt-BR"), "pt"));
        assert!(lang_matches(Some("EN"), "en"));
        assert!(!lang_matches(Some("en"), "pt"));
        assert!(lang_matches(None, ""));
        assert!(!lang_matches(Some("en"), ""));
    }

    #[test]
    fn best_literal_prefers_language_then_untagged() {
        let terms = [
            Term::lang_literal("Person", "en"),
            Term::literal("Pessoa (sem idioma)"),
            Term::lang_literal("Pessoa", "pt"),
        ];
        assert_eq!(best_literal(&terms, Some("pt")), Some("Pessoa"));
        assert_eq!(best_literal(&terms, Some("fr")), Some("Pessoa (sem idioma)"));
        assert_eq!(best_literal(&terms[..1], Some("fr")), Some("Person"));
        assert_eq!(best_literal(&[] as &[Term], None), None);
    }
}
