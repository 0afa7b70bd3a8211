use std::sync::Arc;

use common::cache::CacheStore;
use common::storage::BlobStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub blobs: Arc<dyn BlobStore>,
    pub cache: Arc<dyn CacheStore>,
}
