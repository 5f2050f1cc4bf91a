use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::mongodb_store::MongoDBStore;
use crate::config::StoreConfig;

/// The storage deployment shared with the auth and jobs services.
///
/// The front end never queries it; it only has to be reachable before
/// traffic is accepted, and stays observable through `/health`.
#[async_trait]
pub trait Store: Send + Sync {
    fn get_name(&self) -> &str;
    async fn ping(&self) -> Result<(), String>;
}

/// Connects to the configured store and verifies it answers.
pub async fn connect_store(config: &StoreConfig) -> Result<Arc<dyn Store>, String> {
    match MongoDBStore::connect(config).await {
        Ok(store) => {
            info!("Successfully connected to MongoDB store.");
            Ok(Arc::new(store))
        }
        Err(e) => {
            error!("Failed to connect to MongoDB store: {}", e);
            Err(e)
        }
    }
}
