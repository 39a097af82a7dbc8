//! Adapter registry: `PmsKind → factory`, initialized once at boot.

use crate::adapters::{beds24::Beds24Adapter, mock::MockAdapter, smoobu::SmoobuAdapter};
use crate::{PmsAdapter, PmsError, PmsResult};
use std::collections::HashMap;
use std::sync::Arc;
use stayrate_core::PmsKind;
use stayrate_store::Integration;

/// Builds an adapter instance from an integration's credential payload.
pub type AdapterFactory =
    Box<dyn Fn(&serde_json::Value) -> PmsResult<Arc<dyn PmsAdapter>> + Send + Sync>;

/// Registry resolving a PMS kind and a credential payload to an adapter.
///
/// The factory set is fixed at boot; adapter instances are built per
/// credential set so two tenants never share a client.
pub struct PmsRegistry {
    factories: HashMap<PmsKind, AdapterFactory>,
}

impl PmsRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every production backend registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PmsKind::Smoobu, Box::new(|credentials| {
            Ok(Arc::new(SmoobuAdapter::from_credentials(credentials)?) as Arc<dyn PmsAdapter>)
        }));
        registry.register(PmsKind::Beds24, Box::new(|credentials| {
            Ok(Arc::new(Beds24Adapter::from_credentials(credentials)?) as Arc<dyn PmsAdapter>)
        }));
        registry.register(PmsKind::Mock, Box::new(|_| {
            Ok(Arc::new(MockAdapter::new()) as Arc<dyn PmsAdapter>)
        }));
        registry
    }

    pub fn register(&mut self, kind: PmsKind, factory: AdapterFactory) {
        self.factories.insert(kind, factory);
    }

    pub fn supports(&self, kind: PmsKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Build an adapter for `kind` from a raw credential payload.
    pub fn resolve(
        &self,
        kind: PmsKind,
        credentials: &serde_json::Value,
    ) -> PmsResult<Arc<dyn PmsAdapter>> {
        let factory = self
            .factories
            .get(&kind)
            .ok_or(PmsError::UnknownKind(kind))?;
        factory(credentials)
    }

    /// Build an adapter from a stored integration row.
    pub fn resolve_integration(&self, integration: &Integration) -> PmsResult<Arc<dyn PmsAdapter>> {
        self.resolve(integration.kind, &integration.credentials)
    }
}

impl Default for PmsRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_covers_production_backends() {
        let registry = PmsRegistry::with_defaults();
        assert!(registry.supports(PmsKind::Smoobu));
        assert!(registry.supports(PmsKind::Beds24));
        assert!(registry.supports(PmsKind::Mock));
    }

    #[test]
    fn resolve_builds_adapter_from_credentials() {
        let registry = PmsRegistry::with_defaults();
        let credentials = serde_json::json!({ "api_key": "smoobu-key" });
        let adapter = registry.resolve(PmsKind::Smoobu, &credentials).unwrap();
        assert_eq!(adapter.metadata().kind, PmsKind::Smoobu);
    }

    #[test]
    fn resolve_rejects_missing_credentials() {
        let registry = PmsRegistry::with_defaults();
        let err = registry
            .resolve(PmsKind::Smoobu, &serde_json::json!({}))
            .unwrap_err();
        assert!(matches!(err, PmsError::Credentials { .. }));
    }

    #[test]
    fn empty_registry_reports_unknown_kind() {
        let registry = PmsRegistry::new();
        let err = registry
            .resolve(PmsKind::Smoobu, &serde_json::json!({}))
            .unwrap_err();
        assert!(matches!(err, PmsError::UnknownKind(PmsKind::Smoobu)));
    }
}
