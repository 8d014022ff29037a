use super::Route;
use crate::settings::SettingsStore;
use tracing::info;

/// Pick the first screen for this launch. Evaluated once; later settings
/// changes do not move an already-running process.
pub fn initial_route(settings: &dyn SettingsStore) -> Route {
    let skip = settings.skip_config_after_connect();
    let endpoint = settings.endpoint_url();
    let route = if skip && endpoint.is_some() {
        Route::Chat
    } else {
        Route::Form
    };
    info!(
        "Start route {} (skip_config_after_connect: {}, endpoint: {:?})",
        route, skip, endpoint
    );
    route
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettingsStore;

    #[test]
    fn test_fresh_install_starts_in_form() {
        let store = MemorySettingsStore::new();
        assert_eq!(initial_route(&store), Route::Form);
    }

    #[test]
    fn test_skip_with_endpoint_starts_in_chat() {
        let store = MemorySettingsStore::new();
        store.set_endpoint_url(Some("wss://x".into())).unwrap();
        assert_eq!(initial_route(&store), Route::Chat);
    }

    #[test]
    fn test_no_skip_starts_in_form() {
        let store = MemorySettingsStore::new();
        store.set_endpoint_url(Some("wss://x".into())).unwrap();
        store.set_skip_config_after_connect(false).unwrap();
        assert_eq!(initial_route(&store), Route::Form);
    }
}
