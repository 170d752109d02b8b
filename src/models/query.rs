use mongodb::bson::{doc, Document};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::document::from_json_map;
use super::timestamp::ClientTimestamp;
use super::validate_email;
use crate::utils::AppError;

pub const QUERY_COLLECTION: &str = "query";

pub const OWNER_FIELD: &str = "hr_email";
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Cópia normalizada (BSON date) de `createdAt`, só para ordenar. Não sai nas respostas.
pub const CREATED_AT_SORT_FIELD: &str = "_createdAtDate";
pub const RECOMMENDATION_COUNT_FIELD: &str = "recommendationCount";

pub const RECENT_LIMIT: i64 = 6;
pub const HIGHLIGHTED_LIMIT: i64 = 8;

/// Body de `POST /query`.
///
/// Só `hr_email` e `createdAt` são obrigatórios; o resto (nome do produto,
/// marca, imagem, motivo...) é guardado como veio.
#[derive(Debug, Deserialize)]
pub struct NewQuery {
    pub hr_email: String,
    #[serde(rename = "createdAt")]
    pub created_at: ClientTimestamp,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl NewQuery {
    pub fn into_document(mut self) -> Result<Document, AppError> {
        reject_reserved_fields(&self.details)?;
        validate_email(OWNER_FIELD, &self.hr_email)?;
        let sort_key = self.created_at.to_bson(CREATED_AT_FIELD)?;

        // O contador é mantido pelo servidor
        if self.details.remove(RECOMMENDATION_COUNT_FIELD).is_some() {
            log::debug!("Ignoring client-supplied {}", RECOMMENDATION_COUNT_FIELD);
        }

        let mut document = from_json_map(&self.details)?;
        document.insert(OWNER_FIELD, self.hr_email);
        document.insert(CREATED_AT_FIELD, self.created_at.to_raw_bson());
        document.insert(CREATED_AT_SORT_FIELD, sort_key);
        document.insert(RECOMMENDATION_COUNT_FIELD, 0);
        Ok(document)
    }
}

/// Body de `PUT /query/{id}`: todos os campos são opcionais, mas os conhecidos
/// passam pela mesma validação do envio.
#[derive(Debug, Deserialize)]
pub struct QueryUpdate {
    pub hr_email: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<ClientTimestamp>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl QueryUpdate {
    /// Campos para o `$set`.
    pub fn into_fields(mut self) -> Result<Document, AppError> {
        reject_reserved_fields(&self.details)?;
        if self.details.remove(RECOMMENDATION_COUNT_FIELD).is_some() {
            log::debug!("Ignoring {} in query update", RECOMMENDATION_COUNT_FIELD);
        }

        let mut fields = from_json_map(&self.details)?;
        if let Some(email) = self.hr_email {
            validate_email(OWNER_FIELD, &email)?;
            fields.insert(OWNER_FIELD, email);
        }
        if let Some(created_at) = self.created_at {
            fields.insert(CREATED_AT_SORT_FIELD, created_at.to_bson(CREATED_AT_FIELD)?);
            fields.insert(CREATED_AT_FIELD, created_at.to_raw_bson());
        }

        if fields.is_empty() {
            return Err(AppError::bad_request("Update body has no fields"));
        }
        Ok(fields)
    }
}

pub fn owner_filter(email: &str) -> Document {
    doc! { OWNER_FIELD: email }
}

fn reject_reserved_fields(details: &Map<String, Value>) -> Result<(), AppError> {
    for field in ["_id", CREATED_AT_SORT_FIELD] {
        if details.contains_key(field) {
            return Err(AppError::bad_request(format!("{field} is assigned by the server")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_query(value: Value) -> NewQuery {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn submit_keeps_free_fields_and_resets_counter() {
        let doc = new_query(json!({
            "hr_email": "a@x.com",
            "createdAt": "2025-06-01T10:00:00Z",
            "productName": "Headphones",
            "recommendationCount": 42,
        }))
        .into_document()
        .unwrap();

        assert_eq!(doc.get_str("productName").unwrap(), "Headphones");
        assert_eq!(doc.get_str(OWNER_FIELD).unwrap(), "a@x.com");
        assert_eq!(doc.get_i32(RECOMMENDATION_COUNT_FIELD).unwrap(), 0);
        assert_eq!(doc.get_str(CREATED_AT_FIELD).unwrap(), "2025-06-01T10:00:00Z");
        assert!(doc.get_datetime(CREATED_AT_SORT_FIELD).is_ok());
    }

    #[test]
    fn epoch_created_at_is_stored_as_sent() {
        let doc = new_query(json!({ "hr_email": "a@x.com", "createdAt": 1718000000000i64 }))
            .into_document()
            .unwrap();
        assert_eq!(doc.get_i64(CREATED_AT_FIELD).unwrap(), 1_718_000_000_000);
        assert_eq!(doc.get_datetime(CREATED_AT_SORT_FIELD).unwrap().timestamp_millis(), 1_718_000_000_000);
    }

    #[test]
    fn sort_field_cannot_be_sent() {
        let err = new_query(json!({
            "hr_email": "a@x.com",
            "createdAt": 1,
            "_createdAtDate": "2001-01-01",
        }))
        .into_document()
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn submit_requires_owner_and_timestamp() {
        let missing: Result<NewQuery, _> = serde_json::from_value(json!({ "hr_email": "a@x.com" }));
        assert!(missing.is_err());

        let bad_email = new_query(json!({ "hr_email": "nobody", "createdAt": 1 })).into_document();
        assert!(matches!(bad_email, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn client_ids_are_rejected() {
        let err = new_query(json!({
            "_id": "665f1c2e9b1e8a3d4c5b6a79",
            "hr_email": "a@x.com",
            "createdAt": 1,
        }))
        .into_document()
        .unwrap_err();
        assert!(err.to_string().contains("_id"));
    }

    #[test]
    fn update_sets_only_submitted_fields() {
        let update: QueryUpdate = serde_json::from_value(json!({
            "productName": "Keyboard",
            "recommendationCount": 9,
        }))
        .unwrap();
        let fields = update.into_fields().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get_str("productName").unwrap(), "Keyboard");
    }

    #[test]
    fn empty_update_is_rejected() {
        let update: QueryUpdate = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(update.into_fields(), Err(AppError::BadRequest(_))));
    }
}
