use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::{FindOptions, UpdateOptions};

use crate::{
    database::MongoDB,
    models::{
        owner_filter, DeleteResponse, InsertResponse, UpdateResponse, CREATED_AT_SORT_FIELD,
        QUERY_COLLECTION, RECOMMENDATION_COUNT_FIELD,
    },
    utils::AppError,
};

/// Acesso à coleção `query`. Cada operação é uma única chamada ao banco.
#[async_trait]
pub trait QueryStore: Send + Sync {
    async fn submit_query(&self, query: Document) -> Result<InsertResponse, AppError>;

    /// Mais recentes primeiro (`createdAt` normalizado, desc)
    async fn list_recent(&self, limit: i64) -> Result<Vec<Document>, AppError>;

    /// Mais recomendadas primeiro (`recommendationCount` desc)
    async fn list_highlighted(&self, limit: i64) -> Result<Vec<Document>, AppError>;

    async fn list_all(&self) -> Result<Vec<Document>, AppError>;

    async fn get_query(&self, id: ObjectId) -> Result<Option<Document>, AppError>;

    /// `hr_email == email`, `createdAt` desc
    async fn list_owned_by(&self, email: &str) -> Result<Vec<Document>, AppError>;

    /// `$set` dos campos com upsert: cria o documento com esse `_id` se não existir.
    async fn replace_query(&self, id: ObjectId, fields: Document) -> Result<UpdateResponse, AppError>;

    async fn delete_query(&self, id: ObjectId) -> Result<DeleteResponse, AppError>;

    async fn adjust_recommendation_count(&self, id: ObjectId, delta: i32) -> Result<UpdateResponse, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

impl MongoDB {
    async fn find_queries(&self, filter: Document, options: Option<FindOptions>) -> Result<Vec<Document>, AppError> {
        let cursor = self
            .collection::<Document>(QUERY_COLLECTION)
            .find(filter)
            .with_options(options)
            .await?;

        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }
}

#[async_trait]
impl QueryStore for MongoDB {
    async fn submit_query(&self, query: Document) -> Result<InsertResponse, AppError> {
        let result = self.collection::<Document>(QUERY_COLLECTION).insert_one(query).await?;
        Ok(result.into())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Document>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { CREATED_AT_SORT_FIELD: -1 })
            .limit(limit)
            .build();
        self.find_queries(Document::new(), Some(options)).await
    }

    async fn list_highlighted(&self, limit: i64) -> Result<Vec<Document>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { RECOMMENDATION_COUNT_FIELD: -1 })
            .limit(limit)
            .build();
        self.find_queries(Document::new(), Some(options)).await
    }

    async fn list_all(&self) -> Result<Vec<Document>, AppError> {
        self.find_queries(Document::new(), None).await
    }

    async fn get_query(&self, id: ObjectId) -> Result<Option<Document>, AppError> {
        let query = self
            .collection::<Document>(QUERY_COLLECTION)
            .find_one(doc! { "_id": id })
            .await?;
        Ok(query)
    }

    async fn list_owned_by(&self, email: &str) -> Result<Vec<Document>, AppError> {
        let options = FindOptions::builder().sort(doc! { CREATED_AT_SORT_FIELD: -1 }).build();
        self.find_queries(owner_filter(email), Some(options)).await
    }

    async fn replace_query(&self, id: ObjectId, fields: Document) -> Result<UpdateResponse, AppError> {
        let options = UpdateOptions::builder().upsert(true).build();

        let result = self
            .collection::<Document>(QUERY_COLLECTION)
            .update_one(doc! { "_id": id }, doc! { "$set": fields })
            .with_options(options)
            .await?;
        Ok(result.into())
    }

    async fn delete_query(&self, id: ObjectId) -> Result<DeleteResponse, AppError> {
        let result = self
            .collection::<Document>(QUERY_COLLECTION)
            .delete_one(doc! { "_id": id })
            .await?;
        Ok(result.into())
    }

    async fn adjust_recommendation_count(&self, id: ObjectId, delta: i32) -> Result<UpdateResponse, AppError> {
        let result = self
            .collection::<Document>(QUERY_COLLECTION)
            .update_one(doc! { "_id": id }, doc! { "$inc": { RECOMMENDATION_COUNT_FIELD: delta } })
            .await?;
        Ok(result.into())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.ping_server().await?;
        Ok(())
    }
}
