use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;
use std::time::Duration;

use crate::models::{
    CREATED_AT_SORT_FIELD, OWNER_FIELD, QUERY_COLLECTION, QUERY_ID_FIELD, RECIPIENT_FIELD,
    RECOMMENDATION_COLLECTION, RECOMMENDATION_COUNT_FIELD, RECOMMENDER_FIELD, TIMESTAMP_SORT_FIELD,
};

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
    transactions: bool,
}

impl MongoDB {
    pub async fn new(uri: &str, db_name: &str, transactions: bool) -> Result<Self, Box<dyn Error>> {
        let mut client_options = ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(Duration::from_secs(300));

        client_options.connect_timeout = Some(Duration::from_secs(5));
        client_options.server_selection_timeout = Some(Duration::from_secs(5));

        // Stable API v1 (strict), igual ao cluster do Atlas espera
        client_options.server_api = Some(
            ServerApi::builder()
                .version(ServerApiVersion::V1)
                .strict(true)
                .deprecation_errors(true)
                .build(),
        );

        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);

        client.database("admin").run_command(doc! { "ping": 1 }).await?;
        log::info!("🏓 Pinged deployment, database: {}", db_name);

        let mongodb = Self { client, db, transactions };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Indexes for the filters and sorts the routes actually use
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        let wanted = [
            (QUERY_COLLECTION, doc! { OWNER_FIELD: 1, CREATED_AT_SORT_FIELD: -1 }),
            (QUERY_COLLECTION, doc! { CREATED_AT_SORT_FIELD: -1 }),
            (QUERY_COLLECTION, doc! { RECOMMENDATION_COUNT_FIELD: -1 }),
            (RECOMMENDATION_COLLECTION, doc! { QUERY_ID_FIELD: 1 }),
            (RECOMMENDATION_COLLECTION, doc! { RECOMMENDER_FIELD: 1, TIMESTAMP_SORT_FIELD: -1 }),
            (RECOMMENDATION_COLLECTION, doc! { RECIPIENT_FIELD: 1, TIMESTAMP_SORT_FIELD: -1 }),
        ];

        for (collection, keys) in wanted {
            let description = format!("{}({})", collection, keys.keys().cloned().collect::<Vec<_>>().join(", "));
            let index = IndexModel::builder().keys(keys).build();

            match self.collection::<Document>(collection).create_index(index).await {
                Ok(_) => log::info!("   ✅ Index ready: {}", description),
                Err(e) => log::debug!("   ℹ️  Index not created {}: {}", description, e),
            }
        }

        log::info!("✅ Database indexes ready");
        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn transactions_enabled(&self) -> bool {
        self.transactions
    }

    pub async fn ping_server(&self) -> mongodb::error::Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let uri = std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let db = MongoDB::new(&uri, "prodQuery_test", false).await;
        assert!(db.is_ok());
        assert!(db.unwrap().ping_server().await.is_ok());
    }
}
