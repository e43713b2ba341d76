use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::consts as perm;
use crate::services::sales::{
    CreateSaleRequest, SaleResponse, UpdateSaleRequest, UpdateSaleStatusRequest,
};
use crate::{auth::AuthUser, errors::ServiceError, ApiResponse, AppState, ListQuery, PaginatedResponse};

fn collect_validation_errors(errors: &validator::ValidationErrors) -> Vec<String> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            let field = field.to_string();
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error.message.as_ref().unwrap_or(&"Invalid value".into())
                )
            })
        })
        .collect()
}

/// List sales with pagination
#[utoipa::path(
    get,
    path = "/api/v1/sales",
    summary = "List sales",
    description = "Get a paginated list of sales, newest first",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
    ),
    responses(
        (status = 200, description = "Sales retrieved successfully", body = ApiResponse<PaginatedResponse<SaleResponse>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<PaginatedResponse<SaleResponse>>>, ServiceError> {
    if !auth_user.has_permission(perm::SALES_READ) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to read sales".to_string(),
        ));
    }

    let limit = query.limit.max(1);
    let svc = state.services.sales.clone();
    let result = svc.list_sales(query.page, limit).await?;
    let total_pages = (result.total + limit - 1) / limit;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: result.sales,
        total: result.total,
        page: query.page,
        limit,
        total_pages,
    })))
}

/// Get sale by ID
#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}",
    summary = "Get sale",
    description = "Get a sale by its ID",
    params(("id" = Uuid, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Sale retrieved successfully", body = ApiResponse<SaleResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<SaleResponse>>, ServiceError> {
    if !auth_user.has_permission(perm::SALES_READ) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to read sales".to_string(),
        ));
    }

    let sale = state.services.sales.get_sale(id).await?;
    Ok(Json(ApiResponse::success(sale)))
}

/// Create a new sale
///
/// The sale is persisted first; when immediate invoicing was requested and
/// fails, the error is returned while the sale remains stored uninvoiced.
#[utoipa::path(
    post,
    path = "/api/v1/sales",
    summary = "Create sale",
    description = "Create a new sale; optionally invoice it immediately",
    request_body = CreateSaleRequest,
    responses(
        (status = 201, description = "Sale created successfully", body = ApiResponse<SaleResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data or invoicing failure", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Invoicing conflict", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_sale(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SaleResponse>>), ServiceError> {
    if !auth_user.has_permission(perm::SALES_CREATE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to create sales".to_string(),
        ));
    }

    if let Err(validation_errors) = request.validate() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::validation_errors(collect_validation_errors(
                &validation_errors,
            ))),
        ));
    }

    let sale = state
        .services
        .sales
        .create_sale(&auth_user.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(sale))))
}

/// Full update of a sale
#[utoipa::path(
    put,
    path = "/api/v1/sales/{id}",
    summary = "Update sale",
    description = "Full update; flipping `invoiced` to true on a completed sale triggers invoicing",
    params(("id" = Uuid, Path, description = "Sale ID")),
    request_body = UpdateSaleRequest,
    responses(
        (status = 200, description = "Sale updated successfully", body = ApiResponse<SaleResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Invoicing conflict", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateSaleRequest>,
) -> Result<Json<ApiResponse<SaleResponse>>, ServiceError> {
    if !auth_user.has_permission(perm::SALES_UPDATE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to update sales".to_string(),
        ));
    }

    if let Err(validation_errors) = request.validate() {
        return Err(ServiceError::ValidationError(
            collect_validation_errors(&validation_errors).join("; "),
        ));
    }

    let sale = state.services.sales.update_sale(id, request).await?;
    Ok(Json(ApiResponse::success(sale)))
}

/// Update a sale's status
#[utoipa::path(
    patch,
    path = "/api/v1/sales/{id}/status",
    summary = "Update sale status",
    description = "Transition the business status; the fulfillment stage is derived",
    params(("id" = Uuid, Path, description = "Sale ID")),
    request_body = UpdateSaleStatusRequest,
    responses(
        (status = 200, description = "Status updated successfully", body = ApiResponse<SaleResponse>),
        (status = 400, description = "Invalid status or transition", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_sale_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateSaleStatusRequest>,
) -> Result<Json<ApiResponse<SaleResponse>>, ServiceError> {
    if !auth_user.has_permission(perm::SALES_UPDATE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to update sales".to_string(),
        ));
    }

    let sale = state.services.sales.update_status(id, request).await?;
    Ok(Json(ApiResponse::success(sale)))
}

/// Mark a sale's order as ready
#[utoipa::path(
    post,
    path = "/api/v1/sales/{id}/ready",
    summary = "Mark sale ready",
    description = "Kitchen signal: moves the fulfillment stage to finished without changing the status",
    params(("id" = Uuid, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Sale marked ready", body = ApiResponse<SaleResponse>),
        (status = 400, description = "Sale is closed", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn mark_sale_ready(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<SaleResponse>>, ServiceError> {
    if !auth_user.has_permission(perm::SALES_UPDATE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to update sales".to_string(),
        ));
    }

    let sale = state.services.sales.mark_ready(id).await?;
    Ok(Json(ApiResponse::success(sale)))
}

/// Invoice a sale
#[utoipa::path(
    post,
    path = "/api/v1/sales/{id}/invoice",
    summary = "Invoice sale",
    description = "Issue a fiscal invoice number for the sale from the active timbrado; at most once per sale",
    params(("id" = Uuid, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Sale invoiced successfully", body = ApiResponse<SaleResponse>),
        (status = 400, description = "Already invoiced, no active timbrado, expired or quota exhausted", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn invoice_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<SaleResponse>>, ServiceError> {
    if !auth_user.has_permission(perm::SALES_INVOICE) {
        return Err(ServiceError::Forbidden(
            "Insufficient permissions to invoice sales".to_string(),
        ));
    }

    let sale = state.services.sales.invoice_sale(id).await?;
    Ok(Json(ApiResponse::success(sale)))
}
