//! Shared application state.

use crate::config::AppConfig;
use crate::platform::PlatformApi;
use crate::registry::RegistryClient;
use crate::sync::EventDispatcher;
use std::sync::Arc;
use url::Url;

/// Process-wide state handed to every request handler. Built once at
/// startup; nothing in it is mutable.
pub struct AppState {
    pub config: AppConfig,
    pub registry: Arc<RegistryClient>,
    pub platform: Arc<dyn PlatformApi>,
    /// Parsed platform base URL (same origin as `config.platform.base_url`).
    pub platform_base: Url,
    pub dispatcher: EventDispatcher,
}
