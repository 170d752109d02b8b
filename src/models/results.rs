use mongodb::bson::Bson;
use mongodb::results::{DeleteResult, InsertOneResult, UpdateResult};
use serde::{Deserialize, Serialize};

/// Resultado de escrita no formato do driver Node (`insertOne`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsertResponse {
    pub acknowledged: bool,
    pub inserted_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<String>,
    pub upserted_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

fn id_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<InsertOneResult> for InsertResponse {
    fn from(result: InsertOneResult) -> Self {
        InsertResponse {
            acknowledged: true,
            inserted_id: id_string(&result.inserted_id),
        }
    }
}

impl From<UpdateResult> for UpdateResponse {
    fn from(result: UpdateResult) -> Self {
        UpdateResponse {
            acknowledged: true,
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_count: u64::from(result.upserted_id.is_some()),
            upserted_id: result.upserted_id.as_ref().map(id_string),
        }
    }
}

impl From<DeleteResult> for DeleteResponse {
    fn from(result: DeleteResult) -> Self {
        DeleteResponse {
            acknowledged: true,
            deleted_count: result.deleted_count,
        }
    }
}
