use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FactuPOS API",
        version = "1.0.0",
        description = r#"
# FactuPOS — Sale Lifecycle & Fiscal Invoicing API

Backend for a Paraguayan retail/restaurant point of sale: the sale status
state machine, per-bracket IVA aggregation, sequential daily order numbering
and timbrado-based invoice issuance.

## Authentication

All endpoints require a JWT bearer token:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Errors use a consistent response format with appropriate status codes:

```json
{
  "error": "Conflict",
  "message": "An active timbrado already exists",
  "request_id": "req-abc123xyz",
  "timestamp": "2025-03-01T00:00:00Z"
}
```

## Pagination

List endpoints take `page` (default 1) and `limit` (default 20).
        "#,
        contact(
            name = "FactuPOS Soporte",
            email = "soporte@factupos.com.py"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "Sales", description = "Sale lifecycle endpoints"),
        (name = "Timbrados", description = "Fiscal authorization endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Sales
        crate::handlers::sales::list_sales,
        crate::handlers::sales::get_sale,
        crate::handlers::sales::create_sale,
        crate::handlers::sales::update_sale,
        crate::handlers::sales::update_sale_status,
        crate::handlers::sales::mark_sale_ready,
        crate::handlers::sales::invoice_sale,

        // Timbrados
        crate::handlers::timbrados::create_timbrado,
        crate::handlers::timbrados::list_timbrados,
        crate::handlers::timbrados::get_active_timbrado,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::ListQuery,

            // Sale types
            crate::services::sales::SaleResponse,
            crate::services::sales::CreateSaleRequest,
            crate::services::sales::UpdateSaleRequest,
            crate::services::sales::UpdateSaleStatusRequest,
            crate::services::sales::SaleItemRequest,
            crate::services::sales::SalePaymentRequest,
            crate::services::sales::InvoiceInfo,
            crate::entities::sale::LineItem,
            crate::entities::sale::PaymentEntry,
            crate::entities::sale::TaxTotals,
            crate::models::sale::SaleStatus,
            crate::models::sale::SaleStage,
            crate::models::sale::SaleMode,
            crate::models::sale::PaymentMethod,
            crate::models::sale::IvaRate,

            // Timbrado types
            crate::handlers::timbrados::CreateTimbradoRequest,
            crate::handlers::timbrados::TimbradoResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_contains_core_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("FactuPOS API"));
        assert!(json.contains("/api/v1/sales"));
        assert!(json.contains("/api/v1/timbrados/active"));
    }
}
