use chrono::{SecondsFormat, TimeZone, Utc};
use mongodb::bson::{self, oid::ObjectId, Bson, Document};
use serde_json::{Map, Value};

use super::query::CREATED_AT_SORT_FIELD;
use super::recommendation::TIMESTAMP_SORT_FIELD;
use crate::utils::AppError;

/// Campos mantidos pelo servidor só para ordenação
const HIDDEN_FIELDS: [&str; 2] = [CREATED_AT_SORT_FIELD, TIMESTAMP_SORT_FIELD];

/// Converte um documento do MongoDB no JSON que o frontend espera:
/// `_id` como string hex e datas como RFC 3339 (mesma saída do driver Node).
pub fn to_json(mut doc: Document) -> Value {
    for field in HIDDEN_FIELDS {
        doc.remove(field);
    }
    flatten_extended_json(Bson::Document(doc).into_relaxed_extjson())
}

pub fn to_json_list(docs: Vec<Document>) -> Vec<Value> {
    docs.into_iter().map(to_json).collect()
}

fn flatten_extended_json(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(hex)) = map.get("$oid") {
                    return Value::String(hex.clone());
                }
                match map.get("$date") {
                    Some(Value::String(iso)) => return Value::String(iso.clone()),
                    // Datas fora de 1970..9999 vêm como {"$date": {"$numberLong": "..."}}
                    Some(Value::Object(inner)) => {
                        if let Some(iso) = inner
                            .get("$numberLong")
                            .and_then(Value::as_str)
                            .and_then(|ms| ms.parse::<i64>().ok())
                            .and_then(millis_to_rfc3339)
                        {
                            return Value::String(iso);
                        }
                    }
                    _ => {}
                }
            }
            Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, flatten_extended_json(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(flatten_extended_json).collect()),
        other => other,
    }
}

/// Fora do alcance do chrono (±262 mil anos) o `$date` sai como veio.
fn millis_to_rfc3339(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Converte o payload livre do cliente em BSON.
pub fn from_json_map(map: &Map<String, Value>) -> Result<Document, AppError> {
    bson::to_document(map).map_err(|e| AppError::bad_request(format!("Unsupported payload: {e}")))
}

pub fn parse_object_id(raw: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| AppError::bad_request(format!("Invalid id: {raw}")))
}
