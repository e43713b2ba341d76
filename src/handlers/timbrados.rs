use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::auth::consts as perm;
use crate::entities::timbrado::Model as TimbradoModel;
use crate::services::timbrados::RegisterTimbrado;
use crate::{auth::AuthUser, errors::ServiceError, ApiResponse, AppState};

fn validate_timbrado_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != 8 || !code.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("code");
        err.message = Some("timbrado code must be exactly 8 digits".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateTimbradoRequest {
    /// 8-digit authorization code
    #[validate(custom = "validate_timbrado_code")]
    pub code: String,

    /// First day of validity
    pub issued_at: NaiveDate,
    /// Nominal expiration day; honored through its entirety plus one day of grace
    pub expires_at: NaiveDate,

    /// 3-digit establishment prefix (default 001)
    pub establishment: Option<String>,
    /// 3-digit branch prefix (default 001)
    pub branch: Option<String>,
    /// Invoice quota for this timbrado
    pub max_invoices: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TimbradoResponse {
    pub id: Uuid,
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub establishment: String,
    pub branch: String,
    pub last_invoice_number: i64,
    pub max_invoices: i64,
    pub created_at: DateTime<Utc>,
}

impl From<TimbradoModel> for TimbradoResponse {
    fn from(model: TimbradoModel) -> Self {
        Self {
            id: model.id,
            code: model.code,
            issued_at: model.issued_at,
            expires_at: model.expires_at,
            establishment: model.establishment,
            branch: model.branch,
            last_invoice_number: model.last_invoice_number,
            max_invoices: model.max_invoices,
            created_at: model.created_at,
        }
    }
}

/// Register a timbrado
#[utoipa::path(
    post,
    path = "/api/v1/timbrados",
    summary = "Register timbrado",
    description = "Register a new fiscal authorization window; only one may be active at a time",
    request_body = CreateTimbradoRequest,
    responses(
        (status = 201, description = "Timbrado registered successfully", body = ApiResponse<TimbradoResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate code or an active timbrado exists", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_timbrado(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateTimbradoRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TimbradoResponse>>), ServiceError> {
    if !auth_user.has_permission(perm::TIMBRADOS_MANAGE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to manage timbrados".to_string(),
        ));
    }

    if let Err(validation_errors) = request.validate() {
        return Err(ServiceError::ValidationError(validation_errors.to_string()));
    }

    let created = state
        .services
        .timbrados
        .register(RegisterTimbrado {
            code: request.code,
            issued_at: request.issued_at,
            expires_at: request.expires_at,
            establishment: request.establishment,
            branch: request.branch,
            max_invoices: request.max_invoices,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(created.into())),
    ))
}

/// List timbrados
#[utoipa::path(
    get,
    path = "/api/v1/timbrados",
    summary = "List timbrados",
    description = "All registered timbrados, newest first",
    responses(
        (status = 200, description = "Timbrados retrieved successfully", body = ApiResponse<Vec<TimbradoResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_timbrados(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<TimbradoResponse>>>, ServiceError> {
    if !auth_user.has_permission(perm::TIMBRADOS_READ) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to read timbrados".to_string(),
        ));
    }

    let timbrados = state.services.timbrados.list().await?;
    Ok(Json(ApiResponse::success(
        timbrados.into_iter().map(TimbradoResponse::from).collect(),
    )))
}

/// Get the active timbrado
#[utoipa::path(
    get,
    path = "/api/v1/timbrados/active",
    summary = "Get active timbrado",
    description = "The timbrado whose validity window contains the current moment",
    responses(
        (status = 200, description = "Active timbrado", body = ApiResponse<TimbradoResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "No active timbrado", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_active_timbrado(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<TimbradoResponse>>, ServiceError> {
    if !auth_user.has_permission(perm::TIMBRADOS_READ) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to read timbrados".to_string(),
        ));
    }

    let timbrado = state
        .services
        .timbrados
        .find_active(Utc::now())
        .await?
        .ok_or_else(|| ServiceError::NotFound("No active timbrado".to_string()))?;

    Ok(Json(ApiResponse::success(timbrado.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_validation_requires_eight_digits() {
        assert!(validate_timbrado_code("12345678").is_ok());
        assert!(validate_timbrado_code("12345").is_err());
        assert!(validate_timbrado_code("abcdefgh").is_err());
        assert!(validate_timbrado_code("123456789").is_err());
    }
}
