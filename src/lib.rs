//! Brainiak
//!
//! Hypermedia JSON views over RDF/OWL knowledge graphs stored in a SPARQL
//! triplestore.
//!
//! Requests are resolved into [`QueryParams`], turned into SPARQL by the
//! [`QueryComposer`], executed through a [`Triplestore`], and the typed result
//! rows are assembled into JSON documents: class listings, class schemas
//! (JSON Schema with per-predicate descriptors), instance listings and
//! instance documents.
//!
//! # Example
//!
//! ```
//! use brainiak::{PrefixRegistry, ROOT_CONTEXT};
//!
//! let registry = PrefixRegistry::new();
//! let uri = format!("{}upper/Person", ROOT_CONTEXT);
//!
//! assert_eq!(registry.shorten(&uri), "upper:Person");
//! assert_eq!(registry.expand("upper:Person"), uri);
//! ```
//!
//! # Documents
//!
//! | Operation | Document |
//! |-----------|----------|
//! | [`Catalog::list_contexts`] | `items` of named graphs |
//! | [`Catalog::list_classes`] | `items` of `owl:Class`es in a graph |
//! | [`ClassSchemaAssembler::get`] | JSON Schema of a class |
//! | [`InstanceAssembler::list`] | `items` of instances of a class |
//! | [`InstanceAssembler::get`] | one instance, one key per predicate |
//!
//! Every document carries `@context` (language and the prefixes used to
//! compact its URIs) and a `links` array of `{href, method, rel}`.

mod cardinality;
mod catalog;
mod class_schema;
mod config;
mod error;
mod gateway;
mod instance;
mod interpret;
mod pagination;
mod params;
mod patch;
mod prefixes;
mod query;
mod schema;
mod sparql;
mod validator;

pub use cardinality::{restriction_for, synthesize, Cardinalities, EnumOption, Restriction};
pub use catalog::Catalog;
pub use class_schema::{ClassSchemaAssembler, JSON_SCHEMA_DRAFT};
pub use config::{Settings, DEFAULT_ENDPOINT, DEFAULT_IGNORED_GRAPH_PREFIXES, DEFAULT_RULESET};
pub use error::{ApiError, FieldError};
pub use gateway::Gateway;
pub use instance::InstanceAssembler;
pub use interpret::{
    best_literal, compress, dedupe_by_id, get_single, is_empty, lang_matches, resource_id,
};
pub use pagination::{links, offset, page_href, split_into_chunks, Link, PaginationState};
pub use params::{QueryParams, Route, DEFAULT_BASE_URL, ROOT_CONTEXT_NAME};
pub use patch::{apply_patch, parse_patch, PatchOp};
pub use prefixes::{
    is_blank_node, is_compact, Context, PrefixRegistry, ROOT_CONTEXT, STANDARD_PREFIXES,
};
pub use query::{
    escape_literal, lang_filter, InstanceListing, Object, QueryComposer, SortOrder, SparqlIri,
    Triple,
};
pub use schema::{
    build as build_properties, collect_predicates, remove_redundant, xsd_to_json,
    PredicateDescriptor, PredicateKind, PropertySchema, RangeInfo,
};
pub use sparql::{Row, SparqlResponse, Term, Triplestore, SPARQL_RESULTS_JSON};
pub use validator::{validate_instance, validation_schema};

#[cfg(feature = "remote")]
pub use sparql::HttpTriplestore;
