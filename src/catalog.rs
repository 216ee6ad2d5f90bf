//! Class and context listings.

use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::interpret::{compress, dedupe_by_id, resource_id};
use crate::pagination::{self, split_into_chunks};
use crate::params::{QueryParams, ROOT_CONTEXT_NAME};
use crate::prefixes::Context;

#[derive(Debug, Clone, Copy)]
pub struct Catalog<'g> {
    gateway: &'g Gateway,
}

impl<'g> Catalog<'g> {
    pub fn new(gateway: &'g Gateway) -> Self {
        Self { gateway }
    }

    /// One page of the classes defined in a graph.
    ///
    /// # Errors
    ///
    /// `NotFound` when the graph does not exist or the page is empty.
    pub fn list_classes(&self, params: &QueryParams) -> Result<Value, ApiError> {
        let graph = params.require_graph()?;
        let lang = params.lang();
        let store = self.gateway.store();
        let composer = self.gateway.composer();

        if !store.ask(&composer.graph_exists(graph))? {
            return Err(ApiError::not_found(format!("graph {} not found", graph.as_str())));
        }

        let state = params.pagination();
        let query = composer.list_classes(graph, lang, state.per_page, state.offset());
        let rows = store.select(&query)?;
        let compressed = compress(&rows, &[("class", "@id"), ("label", "title")], None);
        let items: Vec<Value> = dedupe_by_id(compressed)
            .into_iter()
            .map(|mut item| {
                let id = item
                    .get("@id")
                    .and_then(Value::as_str)
                    .map(|id| resource_id(id).to_string());
                if let Some(id) = id {
                    item.insert("resource_id".into(), json!(id));
                }
                Value::Object(item)
            })
            .collect();
        if items.is_empty() {
            return Err(ApiError::not_found(format!(
                "no classes in graph {} on page {}",
                graph.as_str(),
                params.page
            )));
        }

        let total = if params.do_item_count {
            Some(self.gateway.count(&composer.count_classes(graph, lang))?)
        } else {
            None
        };

        let ctx = Context::new(self.gateway.registry(), lang);
        let mut doc = Map::new();
        doc.insert("@id".into(), json!(graph.as_str()));
        doc.insert("@context".into(), ctx.to_json());
        doc.insert("items".into(), Value::Array(items));
        if let Some(total) = total {
            doc.insert("item_count".into(), json!(total));
        }
        doc.insert(
            "links".into(),
            json!(pagination::links(&params.url, &state.with_total(total))),
        );
        Ok(Value::Object(doc))
    }

    /// One page of the named graphs of the knowledge base.
    ///
    /// Triplestore system graphs are filtered out in memory, so the whole
    /// list is fetched and paginated here.
    pub fn list_contexts(&self, params: &QueryParams) -> Result<Value, ApiError> {
        let settings = self.gateway.settings();
        let registry = self.gateway.registry();
        let rows = self
            .gateway
            .store()
            .select(&self.gateway.composer().list_contexts())?;

        let mut graphs: Vec<&str> = Vec::new();
        for graph in rows.iter().filter_map(|row| row.value("graph")) {
            if !settings.is_ignored_graph(graph) && !graphs.contains(&graph) {
                graphs.push(graph);
            }
        }
        let total = graphs.len() as u64;

        let items: Vec<Value> = graphs
            .into_iter()
            .map(|graph| {
                let name = if graph == settings.root_context {
                    ROOT_CONTEXT_NAME.to_string()
                } else if registry.iter().any(|(_, ns)| ns == graph) {
                    registry.slug(graph)
                } else {
                    match graph.strip_prefix(settings.root_context.as_str()) {
                        Some(rest) => rest.trim_end_matches('/').to_string(),
                        None => registry.slug(graph),
                    }
                };
                json!({
                    "@id": graph,
                    "title": registry.slug(graph),
                    "resource_id": name
                })
            })
            .collect();

        let per_page = usize::try_from(params.per_page).unwrap_or(usize::MAX);
        let page = usize::try_from(params.page).unwrap_or(usize::MAX);
        let items = split_into_chunks(items, per_page)
            .into_iter()
            .nth(page)
            .ok_or_else(|| ApiError::not_found(format!("no contexts on page {}", params.page)))?;

        let state = params.pagination().with_total(Some(total));
        let links = pagination::links(&params.url, &state);

        let ctx = Context::new(registry, params.lang());
        Ok(json!({
            "@id": params.resource_href(),
            "@context": ctx.to_json(),
            "items": items,
            "item_count": total,
            "links": links
        }))
    }
}
