//! Application state for the tax engine API.

use std::sync::Arc;

use crate::config::ConfigLoader;
use crate::orchestrator::TaxCalculationService;

/// Shared application state.
///
/// Holds the calculation service, backed by the loaded rate configuration.
#[derive(Clone)]
pub struct AppState {
    service: Arc<TaxCalculationService<ConfigLoader>>,
}

impl AppState {
    /// Creates the state from a loaded configuration.
    pub fn new(config: ConfigLoader) -> Self {
        Self {
            service: Arc::new(TaxCalculationService::new(config)),
        }
    }

    /// The calculation service.
    pub fn service(&self) -> &TaxCalculationService<ConfigLoader> {
        &self.service
    }

    /// The loaded rate configuration.
    pub fn config(&self) -> &ConfigLoader {
        self.service.rates()
    }
}
