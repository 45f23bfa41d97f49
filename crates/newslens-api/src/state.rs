//! Application state shared across all route handlers.

use std::sync::Arc;

use newslens_core::config::NewslensConfig;
use newslens_search::SearchService;
use newslens_vector::VectorStore;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<NewslensConfig>,
    pub store: Arc<VectorStore>,
    pub search: Arc<SearchService>,
}

impl AppState {
    pub fn new(config: NewslensConfig, store: Arc<VectorStore>) -> Self {
        let search = SearchService::new(Arc::clone(&store), &config.search);
        Self {
            config: Arc::new(config),
            store,
            search: Arc::new(search),
        }
    }
}
