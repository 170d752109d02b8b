use async_trait::async_trait;
use futures::{FutureExt, TryStreamExt};
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::FindOptions;

use crate::{
    database::MongoDB,
    models::{
        recipient_filter, DeleteResponse, InsertResponse, ValidRecommendation, QUERY_COLLECTION,
        QUERY_ID_FIELD, RECOMMENDATION_COLLECTION, RECOMMENDATION_COUNT_FIELD, RECOMMENDER_FIELD,
        TIMESTAMP_SORT_FIELD,
    },
    utils::AppError,
};

/// Acesso à coleção `recommendations`.
///
/// Criar uma recomendação também incrementa o `recommendationCount` da query
/// pai. Apagar NÃO decrementa: o cliente chama `PATCH /query/{id}` depois.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Insere e incrementa o contador da query. Query inexistente → `NotFound`.
    async fn create_recommendation(&self, recommendation: ValidRecommendation) -> Result<InsertResponse, AppError>;

    async fn list_by_query(&self, query_id: &str) -> Result<Vec<Document>, AppError>;

    /// `recommenderEmail == email`, `timestamp` desc
    async fn list_by_recommender(&self, email: &str) -> Result<Vec<Document>, AppError>;

    /// `userEmail == email`, `timestamp` desc
    async fn list_received_by(&self, email: &str) -> Result<Vec<Document>, AppError>;

    async fn delete_recommendation(&self, id: ObjectId) -> Result<DeleteResponse, AppError>;
}

fn parent_not_found(id: &ObjectId) -> AppError {
    AppError::not_found(format!("query {} not found", id.to_hex()))
}

impl MongoDB {
    async fn find_recommendations(&self, filter: Document, options: Option<FindOptions>) -> Result<Vec<Document>, AppError> {
        let cursor = self
            .collection::<Document>(RECOMMENDATION_COLLECTION)
            .find(filter)
            .with_options(options)
            .await?;

        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    /// Incremento + insert na mesma transação. `and_run` repete o callback em
    /// `TransientTransactionError` e o commit em `UnknownTransactionCommitResult`.
    async fn create_in_transaction(&self, recommendation: ValidRecommendation) -> Result<InsertResponse, AppError> {
        let queries = self.collection::<Document>(QUERY_COLLECTION);
        let recommendations = self.collection::<Document>(RECOMMENDATION_COLLECTION);

        let mut session = self.client().start_session().await?;
        let inserted = session
            .start_transaction()
            .and_run(
                (&queries, &recommendations, &recommendation),
                |session, (queries, recommendations, recommendation)| {
                    async move {
                        let increment = queries
                            .update_one(
                                doc! { "_id": recommendation.query_id },
                                doc! { "$inc": { RECOMMENDATION_COUNT_FIELD: 1 } },
                            )
                            .session(&mut *session)
                            .await?;
                        if increment.matched_count == 0 {
                            // Nada escrito: o commit vazio só encerra a transação
                            return Ok(None);
                        }

                        let inserted = recommendations
                            .insert_one(&recommendation.document)
                            .session(&mut *session)
                            .await?;
                        Ok(Some(inserted))
                    }
                    .boxed()
                },
            )
            .await?;

        inserted
            .map(InsertResponse::from)
            .ok_or_else(|| parent_not_found(&recommendation.query_id))
    }

    /// Sem transação (MongoDB standalone): confere a query, insere, incrementa.
    async fn create_sequentially(&self, recommendation: ValidRecommendation) -> Result<InsertResponse, AppError> {
        let queries = self.collection::<Document>(QUERY_COLLECTION);
        let filter = doc! { "_id": recommendation.query_id };

        if queries.find_one(filter.clone()).await?.is_none() {
            return Err(parent_not_found(&recommendation.query_id));
        }

        let inserted = self
            .collection::<Document>(RECOMMENDATION_COLLECTION)
            .insert_one(recommendation.document)
            .await?;

        if let Err(e) = queries
            .update_one(filter, doc! { "$inc": { RECOMMENDATION_COUNT_FIELD: 1 } })
            .await
        {
            // O insert já foi feito: o contador fica uma unidade abaixo
            log::error!(
                "❌ Recommendation inserted but count increment failed for query {}: {}",
                recommendation.query_id.to_hex(),
                e
            );
            return Err(e.into());
        }

        Ok(inserted.into())
    }
}

#[async_trait]
impl RecommendationStore for MongoDB {
    async fn create_recommendation(&self, recommendation: ValidRecommendation) -> Result<InsertResponse, AppError> {
        if self.transactions_enabled() {
            self.create_in_transaction(recommendation).await
        } else {
            self.create_sequentially(recommendation).await
        }
    }

    async fn list_by_query(&self, query_id: &str) -> Result<Vec<Document>, AppError> {
        self.find_recommendations(doc! { QUERY_ID_FIELD: query_id }, None).await
    }

    async fn list_by_recommender(&self, email: &str) -> Result<Vec<Document>, AppError> {
        let options = FindOptions::builder().sort(doc! { TIMESTAMP_SORT_FIELD: -1 }).build();
        self.find_recommendations(doc! { RECOMMENDER_FIELD: email }, Some(options)).await
    }

    async fn list_received_by(&self, email: &str) -> Result<Vec<Document>, AppError> {
        let options = FindOptions::builder().sort(doc! { TIMESTAMP_SORT_FIELD: -1 }).build();
        self.find_recommendations(recipient_filter(email), Some(options)).await
    }

    async fn delete_recommendation(&self, id: ObjectId) -> Result<DeleteResponse, AppError> {
        let result = self
            .collection::<Document>(RECOMMENDATION_COLLECTION)
            .delete_one(doc! { "_id": id })
            .await?;
        Ok(result.into())
    }
}
