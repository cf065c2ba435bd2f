pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;
pub mod treefilter;

use std::sync::Arc;

use store::PageRepository;

pub struct AppState {
    pub repository: Arc<dyn PageRepository>,
    pub viewer_header: String,
}
