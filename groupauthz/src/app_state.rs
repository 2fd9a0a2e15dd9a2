use std::sync::Arc;

use groupauthz_core::{AuthorizationEngine, StoreRegistry};
use tracing::info;

use crate::chain::{AuthorizationChain, DbmGroupMechanism, RequireUserMechanism};
use crate::settings::config::Settings;
use crate::settings::resource::ProtectedResource;

#[derive(Debug)]
pub struct AppState {
    pub settings: Settings,
    pub resources: Vec<ProtectedResource>,
    pub chain: AuthorizationChain,
}

pub type SharedAppState = Arc<AppState>;

impl AppState {
    pub fn new() -> anyhow::Result<SharedAppState> {
        let settings = Settings::new()?;
        Self::from_settings(settings, StoreRegistry::with_defaults())
    }

    /// Build the state from already loaded settings, using `registry` to
    /// resolve the store types of all resources.
    pub fn from_settings(
        settings: Settings,
        registry: StoreRegistry,
    ) -> anyhow::Result<SharedAppState> {
        let resources = settings.protected_resources()?;
        let chain = Self::default_chain(registry);

        info!(
            "Authorization initialized with {} protected resources, chain: [{}]",
            resources.len(),
            chain.mechanism_names().join(", ")
        );

        Ok(Arc::new(AppState {
            settings,
            resources,
            chain,
        }))
    }

    /// Group file checks first, plain user requirements last.
    pub fn default_chain(registry: StoreRegistry) -> AuthorizationChain {
        let engine = AuthorizationEngine::new(Arc::new(registry));
        AuthorizationChain::new()
            .with(DbmGroupMechanism::new(engine))
            .with(RequireUserMechanism)
    }

    /// The resource with the longest prefix covering `path`.
    pub fn find_resource(&self, path: &str) -> Option<&ProtectedResource> {
        self.find_resource_index(path)
            .map(|index| &self.resources[index])
    }

    pub fn find_resource_index(&self, path: &str) -> Option<usize> {
        self.resources
            .iter()
            .enumerate()
            .filter(|(_, resource)| resource.covers(path))
            .max_by_key(|(_, resource)| resource.path.len())
            .map(|(index, _)| index)
    }
}
