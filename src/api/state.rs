use crate::service::{forest_fires::ForestFiresService, proxy::ProxyService};

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * The service for the forest fire records.
     */
    pub forest_fires_service: ForestFiresService,
    /**
     * The service forwarding requests to upstream statistics APIs.
     */
    pub proxy_service: ProxyService,
    /**
     * Where the docs endpoint redirects to.
     */
    pub docs_url: String,
}

/**
 * Creates a new instance of `AppState`.
 *
 * # Arguments
 * `forest_fires_service`: The service for the forest fire records.
 * `proxy_service`: The service forwarding requests to upstream statistics APIs.
 * `docs_url`: Where the docs endpoint redirects to.
 */
impl AppState {
    pub fn new(forest_fires_service: ForestFiresService, proxy_service: ProxyService, docs_url: String) -> Self {
        AppState { forest_fires_service, proxy_service, docs_url }
    }
}
