//! Process-wide state shared by every request.

use crate::catalog::Catalog;
use crate::class_schema::ClassSchemaAssembler;
use crate::config::Settings;
use crate::error::ApiError;
use crate::instance::InstanceAssembler;
use crate::interpret::get_single;
use crate::params::{QueryParams, Route};
use crate::prefixes::PrefixRegistry;
use crate::query::{QueryComposer, SparqlIri};
use crate::sparql::Triplestore;

/// A triplestore together with the settings, prefix table and query composer.
///
/// Built once at process start; assemblers borrow it per request.
pub struct Gateway {
    store: Box<dyn Triplestore>,
    settings: Settings,
    registry: PrefixRegistry,
    composer: QueryComposer,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("settings", &self.settings)
            .field("composer", &self.composer)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// # Errors
    ///
    /// Returns `ApiError::InvalidParameter` if the configured ruleset is not an IRI.
    pub fn new(store: Box<dyn Triplestore>, settings: Settings) -> Result<Self, ApiError> {
        let ruleset = SparqlIri::param("ruleset", &settings.ruleset)?;
        Ok(Self {
            store,
            registry: settings.prefix_registry(),
            composer: QueryComposer::new(ruleset),
            settings,
        })
    }

    /// Gateway over the HTTP endpoint named in `settings`.
    #[cfg(feature = "remote")]
    pub fn connect(settings: Settings) -> Result<Self, ApiError> {
        let mut store =
            crate::sparql::HttpTriplestore::new(&settings.endpoint, settings.timeout())?;
        if let (Some(user), Some(password)) = (&settings.user, &settings.password) {
            store = store.with_credentials(user, password);
        }
        Self::new(Box::new(store), settings)
    }

    pub fn store(&self) -> &dyn Triplestore {
        self.store.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &PrefixRegistry {
        &self.registry
    }

    pub fn composer(&self) -> &QueryComposer {
        &self.composer
    }

    /// Resolve request parameters against this gateway's prefixes and settings.
    pub fn params(
        &self,
        route: Route,
        query: &[(String, String)],
    ) -> Result<QueryParams, ApiError> {
        QueryParams::resolve(route, query, &self.registry, &self.settings)
    }

    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(self)
    }

    pub fn class_schemas(&self) -> ClassSchemaAssembler<'_> {
        ClassSchemaAssembler::new(self)
    }

    pub fn instances(&self) -> InstanceAssembler<'_> {
        InstanceAssembler::new(self)
    }

    /// Run a `COUNT ... AS ?total_items` query.
    pub(crate) fn count(&self, sparql: &str) -> Result<u64, ApiError> {
        let rows = self.store.select(sparql)?;
        let total = get_single(&rows, "total_items")
            .ok_or_else(|| ApiError::upstream("count query returned no total_items"))?;
        total
            .parse()
            .map_err(|_| ApiError::upstream(format!("count query returned \"{}\"", total)))
    }
}
