pub mod document;
pub mod query;
pub mod recommendation;
pub mod results;
pub mod timestamp;

pub use document::*;
pub use query::*;
pub use recommendation::*;
pub use results::*;
pub use timestamp::*;

use serde::Deserialize;

use crate::utils::AppError;

/// `?email=` das rotas do usuário logado
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmailParam {
    /// Email do usuário autenticado
    pub email: Option<String>,
}

/// `?queryId=` de `GET /recommendations`
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct QueryIdParam {
    /// Id da query (hex de 24 caracteres)
    pub query_id: String,
}

/// Validação mínima de email: não vazio, sem espaços, com `@` no meio.
pub fn validate_email(field: &str, value: &str) -> Result<(), AppError> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::bad_request(format!("{field} must be a valid email")))
    }
}
