use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::store::Store;

/// A `Store` backed by a MongoDB deployment.
pub struct MongoDBStore {
    database: Database,
}

impl MongoDBStore {
    /// Builds a client from the configured URI and pings the database.
    /// The client itself connects lazily, so the ping is what proves reachability.
    pub async fn connect(config: &StoreConfig) -> Result<Self, String> {
        info!("Connecting to MongoDB database '{}'", config.database);

        let mut client_options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| format!("Failed to parse MongoDB URI: {}", e))?;
        client_options.app_name = Some("jobfront".to_string());
        let timeout = Duration::from_millis(config.connect_timeout_ms);
        client_options.connect_timeout = Some(timeout);
        client_options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(client_options)
            .map_err(|e| format!("Failed to create MongoDB client: {}", e))?;

        let store = MongoDBStore {
            database: client.database(&config.database),
        };
        store.ping().await?;

        info!("MongoDB connection established successfully.");
        Ok(store)
    }
}

#[async_trait]
impl Store for MongoDBStore {
    fn get_name(&self) -> &str {
        "mongodb"
    }

    async fn ping(&self) -> Result<(), String> {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| format!("MongoDB ping failed: {}", e))?;
        debug!("MongoDB ping succeeded.");
        Ok(())
    }
}
