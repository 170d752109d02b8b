use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use std::cmp::Ordering;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    models::{
        DeleteResponse, InsertResponse, UpdateResponse, ValidRecommendation, CREATED_AT_SORT_FIELD,
        OWNER_FIELD, QUERY_ID_FIELD, RECIPIENT_FIELD, RECOMMENDATION_COUNT_FIELD, RECOMMENDER_FIELD,
        TIMESTAMP_SORT_FIELD,
    },
    services::{QueryStore, RecommendationStore},
    utils::AppError,
};

/// Store em memória com a mesma semântica das coleções do MongoDB.
/// Usado em desenvolvimento local (`STORAGE_BACKEND=memory`) e nos testes.
#[derive(Default)]
pub struct MemoryStore {
    queries: RwLock<Vec<Document>>,
    recommendations: RwLock<Vec<Document>>,
}

fn read(lock: &RwLock<Vec<Document>>) -> Result<RwLockReadGuard<'_, Vec<Document>>, AppError> {
    lock.read().map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
}

fn write(lock: &RwLock<Vec<Document>>) -> Result<RwLockWriteGuard<'_, Vec<Document>>, AppError> {
    lock.write().map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
}

fn has_id(document: &Document, id: &ObjectId) -> bool {
    document.get_object_id("_id").map_or(false, |found| &found == id)
}

fn field_equals(document: &Document, field: &str, value: &str) -> bool {
    document.get_str(field).map_or(false, |found| found == value)
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Ordem do MongoDB para os tipos que aparecem nos campos de ordenação:
/// ausente/null < números < strings < datas.
fn compare_bson(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    fn rank(value: Option<&Bson>) -> u8 {
        match value {
            None | Some(Bson::Null) => 0,
            Some(Bson::Int32(_)) | Some(Bson::Int64(_)) | Some(Bson::Double(_)) => 1,
            Some(Bson::String(_)) => 2,
            Some(Bson::DateTime(_)) => 4,
            Some(_) => 3,
        }
    }

    match (a, b) {
        (Some(Bson::String(x)), Some(Bson::String(y))) => x.cmp(y),
        (Some(Bson::DateTime(x)), Some(Bson::DateTime(y))) => x.cmp(y),
        (Some(x), Some(y)) => match (as_number(x), as_number(y)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => rank(a).cmp(&rank(b)),
        },
        _ => rank(a).cmp(&rank(b)),
    }
}

fn sorted_desc(mut documents: Vec<Document>, field: &str) -> Vec<Document> {
    documents.sort_by(|a, b| compare_bson(b.get(field), a.get(field)));
    documents
}

fn increment(document: &mut Document, field: &str, delta: i32) {
    let next = match document.get(field) {
        Some(Bson::Int32(n)) => n
            .checked_add(delta)
            .map(Bson::Int32)
            .unwrap_or_else(|| Bson::Int64(i64::from(*n) + i64::from(delta))),
        Some(Bson::Int64(n)) => Bson::Int64(n + i64::from(delta)),
        Some(Bson::Double(n)) => Bson::Double(n + f64::from(delta)),
        _ => Bson::Int32(delta),
    };
    document.insert(field, next);
}

#[async_trait]
impl QueryStore for MemoryStore {
    async fn submit_query(&self, mut query: Document) -> Result<InsertResponse, AppError> {
        let id = ObjectId::new();
        query.insert("_id", id);
        write(&self.queries)?.push(query);

        Ok(InsertResponse {
            acknowledged: true,
            inserted_id: id.to_hex(),
        })
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Document>, AppError> {
        let all = read(&self.queries)?.clone();
        Ok(sorted_desc(all, CREATED_AT_SORT_FIELD)
            .into_iter()
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn list_highlighted(&self, limit: i64) -> Result<Vec<Document>, AppError> {
        let all = read(&self.queries)?.clone();
        Ok(sorted_desc(all, RECOMMENDATION_COUNT_FIELD)
            .into_iter()
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Document>, AppError> {
        Ok(read(&self.queries)?.clone())
    }

    async fn get_query(&self, id: ObjectId) -> Result<Option<Document>, AppError> {
        Ok(read(&self.queries)?.iter().find(|q| has_id(q, &id)).cloned())
    }

    async fn list_owned_by(&self, email: &str) -> Result<Vec<Document>, AppError> {
        let owned = read(&self.queries)?
            .iter()
            .filter(|q| field_equals(q, OWNER_FIELD, email))
            .cloned()
            .collect();
        Ok(sorted_desc(owned, CREATED_AT_SORT_FIELD))
    }

    async fn replace_query(&self, id: ObjectId, fields: Document) -> Result<UpdateResponse, AppError> {
        let mut queries = write(&self.queries)?;

        if let Some(existing) = queries.iter_mut().find(|q| has_id(q, &id)) {
            let mut modified = false;
            for (key, value) in fields {
                if existing.get(&key) != Some(&value) {
                    existing.insert(key, value);
                    modified = true;
                }
            }
            return Ok(UpdateResponse {
                acknowledged: true,
                matched_count: 1,
                modified_count: u64::from(modified),
                upserted_id: None,
                upserted_count: 0,
            });
        }

        let mut created = doc! { "_id": id };
        for (key, value) in fields {
            created.insert(key, value);
        }
        queries.push(created);

        Ok(UpdateResponse {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id.to_hex()),
            upserted_count: 1,
        })
    }

    async fn delete_query(&self, id: ObjectId) -> Result<DeleteResponse, AppError> {
        let mut queries = write(&self.queries)?;
        let before = queries.len();
        if let Some(index) = queries.iter().position(|q| has_id(q, &id)) {
            queries.remove(index);
        }

        Ok(DeleteResponse {
            acknowledged: true,
            deleted_count: (before - queries.len()) as u64,
        })
    }

    async fn adjust_recommendation_count(&self, id: ObjectId, delta: i32) -> Result<UpdateResponse, AppError> {
        let mut queries = write(&self.queries)?;
        let matched = match queries.iter_mut().find(|q| has_id(q, &id)) {
            Some(query) => {
                increment(query, RECOMMENDATION_COUNT_FIELD, delta);
                1
            }
            None => 0,
        };

        Ok(UpdateResponse {
            acknowledged: true,
            matched_count: matched,
            modified_count: matched,
            upserted_id: None,
            upserted_count: 0,
        })
    }

    async fn ping(&self) -> Result<(), AppError> {
        read(&self.queries).map(|_| ())
    }
}

#[async_trait]
impl RecommendationStore for MemoryStore {
    async fn create_recommendation(&self, recommendation: ValidRecommendation) -> Result<InsertResponse, AppError> {
        // Sempre queries → recommendations, para não inverter a ordem dos locks
        let mut queries = write(&self.queries)?;
        let mut recommendations = write(&self.recommendations)?;

        let parent = queries
            .iter_mut()
            .find(|q| has_id(q, &recommendation.query_id))
            .ok_or_else(|| AppError::not_found(format!("query {} not found", recommendation.query_id.to_hex())))?;
        increment(parent, RECOMMENDATION_COUNT_FIELD, 1);

        let id = ObjectId::new();
        let mut document = recommendation.document;
        document.insert("_id", id);
        recommendations.push(document);

        Ok(InsertResponse {
            acknowledged: true,
            inserted_id: id.to_hex(),
        })
    }

    async fn list_by_query(&self, query_id: &str) -> Result<Vec<Document>, AppError> {
        Ok(read(&self.recommendations)?
            .iter()
            .filter(|r| field_equals(r, QUERY_ID_FIELD, query_id))
            .cloned()
            .collect())
    }

    async fn list_by_recommender(&self, email: &str) -> Result<Vec<Document>, AppError> {
        let authored = read(&self.recommendations)?
            .iter()
            .filter(|r| field_equals(r, RECOMMENDER_FIELD, email))
            .cloned()
            .collect();
        Ok(sorted_desc(authored, TIMESTAMP_SORT_FIELD))
    }

    async fn list_received_by(&self, email: &str) -> Result<Vec<Document>, AppError> {
        let received = read(&self.recommendations)?
            .iter()
            .filter(|r| field_equals(r, RECIPIENT_FIELD, email))
            .cloned()
            .collect();
        Ok(sorted_desc(received, TIMESTAMP_SORT_FIELD))
    }

    async fn delete_recommendation(&self, id: ObjectId) -> Result<DeleteResponse, AppError> {
        let mut recommendations = write(&self.recommendations)?;
        let before = recommendations.len();
        recommendations.retain(|r| !has_id(r, &id));

        Ok(DeleteResponse {
            acknowledged: true,
            deleted_count: (before - recommendations.len()) as u64,
        })
    }
}
