use crate::location::LocationResolver;
use std::sync::Arc;

/// Shared by every handler. The resolver is immutable, so no lock.
pub struct AppState {
    pub resolver: Arc<LocationResolver>,
}
