//! # Application State
//!
//! Shared state for the Axum application: the negotiation service and the
//! dispute monitor, both behind `Arc` so handlers clone cheaply.

use std::sync::Arc;

use sidepot_dispute::DisputeMonitor;
use sidepot_negotiation::NegotiationService;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// The counter-offer protocol service.
    pub negotiation: Arc<NegotiationService>,
    /// The dispute monitor (operational hooks; the sweep runs separately).
    pub monitor: Arc<DisputeMonitor>,
}

impl AppState {
    /// Create application state over the given services.
    pub fn new(negotiation: Arc<NegotiationService>, monitor: Arc<DisputeMonitor>) -> Self {
        Self {
            negotiation,
            monitor,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
