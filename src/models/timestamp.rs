use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::{Bson, DateTime as BsonDateTime};
use serde::Deserialize;

use crate::utils::AppError;

/// Timestamp enviado pelo cliente (`createdAt`, `timestamp`).
///
/// O frontend manda `Date.now()` ou `new Date().toISOString()`, então aceitamos
/// epoch em milissegundos, RFC 3339 ou uma data simples `YYYY-MM-DD`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ClientTimestamp {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

impl ClientTimestamp {
    /// O valor exatamente como o cliente mandou.
    pub fn to_raw_bson(&self) -> Bson {
        match self {
            ClientTimestamp::Millis(ms) => Bson::Int64(*ms),
            ClientTimestamp::Fractional(ms) => Bson::Double(*ms),
            ClientTimestamp::Text(raw) => Bson::String(raw.clone()),
        }
    }

    /// Data normalizada usada para ordenar.
    pub fn to_bson(&self, field: &str) -> Result<BsonDateTime, AppError> {
        let invalid = || AppError::bad_request(format!("{field} must be an ISO-8601 date or epoch milliseconds"));

        match self {
            ClientTimestamp::Millis(ms) => Ok(BsonDateTime::from_millis(*ms)),
            ClientTimestamp::Fractional(ms) if ms.is_finite() => Ok(BsonDateTime::from_millis(ms.trunc() as i64)),
            ClientTimestamp::Fractional(_) => Err(invalid()),
            ClientTimestamp::Text(raw) => {
                let raw = raw.trim();
                if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                    return Ok(BsonDateTime::from_millis(dt.with_timezone(&Utc).timestamp_millis()));
                }
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|naive| BsonDateTime::from_millis(naive.and_utc().timestamp_millis()))
                    .ok_or_else(invalid)
            }
        }
    }
}
