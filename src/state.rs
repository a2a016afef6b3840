use std::sync::Arc;

use crate::service::{CatalogService, QueryService, RegistrationService};
use crate::store::TicketPoolStore;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub registrations: RegistrationService,
    pub queries: QueryService,
}

impl AppState {
    pub fn new(store: Arc<dyn TicketPoolStore>) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            registrations: RegistrationService::new(store.clone()),
            queries: QueryService::new(store),
        }
    }
}
