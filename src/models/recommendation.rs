use mongodb::bson::{doc, oid::ObjectId, Document};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::document::{from_json_map, parse_object_id};
use super::timestamp::ClientTimestamp;
use super::validate_email;
use crate::utils::AppError;

pub const RECOMMENDATION_COLLECTION: &str = "recommendations";

pub const QUERY_ID_FIELD: &str = "queryId";
pub const RECOMMENDER_FIELD: &str = "recommenderEmail";
pub const RECIPIENT_FIELD: &str = "userEmail";
pub const TIMESTAMP_FIELD: &str = "timestamp";
/// Cópia normalizada de `timestamp` para ordenar, escondida nas respostas.
pub const TIMESTAMP_SORT_FIELD: &str = "_timestampDate";

/// Body de `POST /recommendations`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecommendation {
    pub query_id: String,
    pub recommender_email: String,
    pub user_email: String,
    pub timestamp: ClientTimestamp,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Recomendação validada, pronta para o insert.
#[derive(Debug, Clone)]
pub struct ValidRecommendation {
    pub query_id: ObjectId,
    pub document: Document,
}

impl NewRecommendation {
    pub fn validate(self) -> Result<ValidRecommendation, AppError> {
        for field in ["_id", TIMESTAMP_SORT_FIELD] {
            if self.details.contains_key(field) {
                return Err(AppError::bad_request(format!("{field} is assigned by the server")));
            }
        }
        let query_id = parse_object_id(&self.query_id)?;
        validate_email(RECOMMENDER_FIELD, &self.recommender_email)?;
        validate_email(RECIPIENT_FIELD, &self.user_email)?;
        let sort_key = self.timestamp.to_bson(TIMESTAMP_FIELD)?;

        let mut document = from_json_map(&self.details)?;
        // queryId continua string, como o frontend sempre gravou
        document.insert(QUERY_ID_FIELD, query_id.to_hex());
        document.insert(RECOMMENDER_FIELD, self.recommender_email);
        document.insert(RECIPIENT_FIELD, self.user_email);
        document.insert(TIMESTAMP_FIELD, self.timestamp.to_raw_bson());
        document.insert(TIMESTAMP_SORT_FIELD, sort_key);

        Ok(ValidRecommendation { query_id, document })
    }
}

pub fn recipient_filter(email: &str) -> Document {
    doc! { RECIPIENT_FIELD: email }
}
