//! Sale lifecycle: creation, status transitions and fiscal invoicing.
//!
//! All cross-request invariants (unique daily ids, at-most-once invoicing)
//! are enforced with conditional writes against the store, never with
//! in-memory state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::sale::{
        self, Entity as SaleEntity, LineItem, LineItems, Model as SaleModel, PaymentEntries,
        PaymentEntry, TaxTotals,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::sale::{
        is_valid_transition, stage_for_status, IvaRate, PaymentMethod, SaleMode, SaleStage,
        SaleStatus,
    },
    services::printing::{ticket_payload, PrintJob, PrintQueue},
    services::sequence::{business_date, DailySequenceService},
    services::taxes,
    services::timbrados::TimbradoService,
};

/// One product line of a sale request.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SaleItemRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,

    #[validate(length(min = 1, message = "product name is required"))]
    pub name: String,
    pub unit: Option<String>,

    #[validate(range(min = 1, message = "quantity must be positive"))]
    pub quantity: i32,

    /// VAT bracket (0, 5 or 10)
    pub iva_rate: IvaRate,
    /// Declared VAT portion; recomputed server-side and checked for
    /// consistency when present
    pub iva_amount: Option<Decimal>,
    /// VAT-inclusive line total
    pub total_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SalePaymentRequest {
    pub payment_method: PaymentMethod,
    pub total_amount: Decimal,
    /// Defaults to the time the payment is recorded
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateSaleRequest {
    /// Rejected when empty; a sale requires at least one product
    #[validate]
    pub products: Vec<SaleItemRequest>,

    #[serde(default)]
    #[validate]
    pub payment: Vec<SalePaymentRequest>,

    #[validate(length(min = 1, message = "ruc is required"))]
    pub ruc: String,

    #[validate(length(min = 1, message = "customer name is required"))]
    pub customer_name: String,

    /// Initial status; server default applies when omitted
    pub status: Option<SaleStatus>,
    pub mode: Option<SaleMode>,

    /// Request immediate fiscal invoicing of the created sale
    #[serde(default)]
    pub invoiced: bool,
}

/// Full update of an existing sale. Omitted fields keep their value.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateSaleRequest {
    #[validate]
    pub products: Option<Vec<SaleItemRequest>>,
    #[validate]
    pub payment: Option<Vec<SalePaymentRequest>>,
    pub ruc: Option<String>,
    pub customer_name: Option<String>,
    pub mode: Option<SaleMode>,
    pub status: Option<SaleStatus>,
    /// May only flip false→true; triggers invoicing when the sale is completed
    pub invoiced: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateSaleStatusRequest {
    pub status: SaleStatus,
    pub ruc: Option<String>,
}

/// Fiscal data attached to a sale by the invoicing operation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvoiceInfo {
    pub invoice_number: String,
    pub timbrado_number: String,
    pub timbrado_init: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaleResponse {
    pub id: Uuid,
    pub daily_id: i64,
    pub business_date: String,
    pub products: Vec<LineItem>,
    pub payment: Vec<PaymentEntry>,
    pub totals: TaxTotals,
    pub total_amount: Decimal,
    pub ruc: String,
    pub customer_name: String,
    pub status: SaleStatus,
    pub stage: SaleStage,
    pub mode: SaleMode,
    pub invoiced: bool,
    pub invoice_number: Option<String>,
    pub timbrado_number: Option<String>,
    pub timbrado_init: Option<DateTime<Utc>>,
    pub user_id: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaleListResponse {
    pub sales: Vec<SaleResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct SaleService {
    db: Arc<DatabaseConnection>,
    sequence: DailySequenceService,
    timbrados: TimbradoService,
    event_sender: Option<Arc<EventSender>>,
    print_queue: Option<PrintQueue>,
    default_status: SaleStatus,
    business_utc_offset_hours: i32,
}

impl SaleService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<DatabaseConnection>,
        sequence: DailySequenceService,
        timbrados: TimbradoService,
        event_sender: Option<Arc<EventSender>>,
        print_queue: Option<PrintQueue>,
        default_status: SaleStatus,
        business_utc_offset_hours: i32,
    ) -> Self {
        Self {
            db,
            sequence,
            timbrados,
            event_sender,
            print_queue,
            default_status,
            business_utc_offset_hours,
        }
    }

    /// Creates a sale: recomputes VAT, assigns the daily order number and
    /// persists with `invoiced = false`.
    ///
    /// When immediate invoicing was requested and fails, the sale stays
    /// persisted and the invoicing error is returned to the caller.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn create_sale(
        &self,
        user_id: &str,
        request: CreateSaleRequest,
    ) -> Result<SaleResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        if request.products.is_empty() {
            return Err(ServiceError::ValidationError(
                "at least one product is required".to_string(),
            ));
        }

        let items = build_line_items(&request.products)?;
        let totals = taxes::aggregate(&items);
        let total_amount = taxes::total_amount(&items);

        let now = Utc::now();
        let payments = build_payments(&request.payment, now);
        check_payment_bound(&payments, total_amount)?;

        let status = request.status.unwrap_or(self.default_status);
        if matches!(status, SaleStatus::Canceled | SaleStatus::Annulled) {
            return Err(ServiceError::InvalidStatus(format!(
                "a sale cannot be created as {}",
                status
            )));
        }

        let date = business_date(now, self.business_utc_offset_hours);
        let daily_id = self.sequence.next_daily_id(date).await?;

        let sale_id = Uuid::new_v4();
        let model = sale::ActiveModel {
            id: Set(sale_id),
            daily_id: Set(daily_id),
            business_date: Set(crate::services::sequence::date_key(date)),
            products: Set(LineItems(items)),
            payment: Set(PaymentEntries(payments)),
            totals: Set(totals),
            total_amount: Set(total_amount),
            ruc: Set(request.ruc.clone()),
            customer_name: Set(request.customer_name.clone()),
            status: Set(status.to_string()),
            stage: Set(SaleStage::Processed.to_string()),
            mode: Set(request.mode.unwrap_or(SaleMode::Local).to_string()),
            invoiced: Set(false),
            invoice_number: Set(None),
            timbrado_number: Set(None),
            timbrado_init: Set(None),
            timbrado_id: Set(None),
            user_id: Set(user_id.to_string()),
            date: Set(now),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        };

        let mut created = model
            .insert(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(sale_id = %sale_id, daily_id = daily_id, "Sale created");
        self.emit(Event::SaleCreated(sale_id)).await;

        if request.invoiced {
            match self.apply_invoice(&created).await {
                Ok(updated) => created = updated,
                Err(e) => {
                    // The sale stays persisted; report the invoicing failure.
                    self.dispatch_print(&created);
                    return Err(e);
                }
            }
        }

        self.dispatch_print(&created);
        model_to_response(created)
    }

    #[instrument(skip(self))]
    pub async fn get_sale(&self, sale_id: Uuid) -> Result<SaleResponse, ServiceError> {
        let sale = self.fetch(sale_id).await?;
        model_to_response(sale)
    }

    /// Lists sales with pagination, newest first.
    #[instrument(skip(self))]
    pub async fn list_sales(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<SaleListResponse, ServiceError> {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let paginator = SaleEntity::find()
            .order_by_desc(sale::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;
        let sales = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(SaleListResponse {
            sales: sales
                .into_iter()
                .map(model_to_response)
                .collect::<Result<_, _>>()?,
            total,
            page,
            per_page,
        })
    }

    /// Full update. Replacing the item list recomputes VAT totals; the
    /// `invoiced` flag may only move false→true and then only completes when
    /// the sale is in `completed` status.
    #[instrument(skip(self, request), fields(sale_id = %sale_id))]
    pub async fn update_sale(
        &self,
        sale_id: Uuid,
        request: UpdateSaleRequest,
    ) -> Result<SaleResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let sale = self.fetch(sale_id).await?;
        let old_status = parse_status(&sale.status)?;
        let now = Utc::now();

        if request.invoiced == Some(false) && sale.invoiced {
            return Err(ServiceError::ValidationError(
                "invoiced cannot be reverted".to_string(),
            ));
        }

        let new_status = match request.status {
            Some(status) if status != old_status => {
                if !is_valid_transition(old_status, status) {
                    return Err(ServiceError::InvalidStatus(format!(
                        "cannot transition from '{}' to '{}'",
                        old_status, status
                    )));
                }
                status
            }
            _ => old_status,
        };

        let rebuilt = match &request.products {
            Some(products) => {
                if sale.invoiced {
                    return Err(ServiceError::ValidationError(
                        "cannot modify products of an invoiced sale".to_string(),
                    ));
                }
                if products.is_empty() {
                    return Err(ServiceError::ValidationError(
                        "at least one product is required".to_string(),
                    ));
                }
                let items = build_line_items(products)?;
                let totals = taxes::aggregate(&items);
                Some((items, totals))
            }
            None => None,
        };
        let total_amount = rebuilt
            .as_ref()
            .map(|(items, _)| taxes::total_amount(items))
            .unwrap_or(sale.total_amount);

        let payments = request
            .payment
            .as_ref()
            .map(|entries| build_payments(entries, now));
        if let Some(entries) = &payments {
            check_payment_bound(entries, total_amount)?;
        } else {
            check_payment_bound(&sale.payment.0, total_amount)?;
        }

        let wants_invoice = request.invoiced == Some(true) && !sale.invoiced;
        if wants_invoice && new_status != SaleStatus::Completed {
            return Err(ServiceError::ValidationError(
                "only a completed sale can be invoiced".to_string(),
            ));
        }

        let mut active: sale::ActiveModel = sale.clone().into();
        if let Some((items, totals)) = rebuilt {
            active.products = Set(LineItems(items));
            active.totals = Set(totals);
            active.total_amount = Set(total_amount);
        }
        if let Some(entries) = payments {
            active.payment = Set(PaymentEntries(entries));
        }
        if let Some(ruc) = &request.ruc {
            active.ruc = Set(ruc.clone());
        }
        if let Some(name) = &request.customer_name {
            active.customer_name = Set(name.clone());
        }
        if let Some(mode) = request.mode {
            active.mode = Set(mode.to_string());
        }
        if new_status != old_status {
            active.status = Set(new_status.to_string());
            if let Some(stage) = stage_for_status(new_status) {
                active.stage = Set(stage.to_string());
            }
        }
        active.updated_at = Set(Some(now));
        active.version = Set(sale.version + 1);

        let mut updated = active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        self.emit(Event::SaleUpdated(sale_id)).await;
        if new_status != old_status {
            self.emit(Event::SaleStatusChanged {
                sale_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
            })
            .await;
        }

        if wants_invoice {
            updated = self.apply_invoice(&updated).await?;
        }

        if new_status == SaleStatus::Completed && old_status != SaleStatus::Completed {
            self.dispatch_print(&updated);
        }

        model_to_response(updated)
    }

    /// Explicit status transition; the fulfillment stage is derived, never
    /// taken from the caller.
    #[instrument(skip(self, request), fields(sale_id = %sale_id, new_status = %request.status))]
    pub async fn update_status(
        &self,
        sale_id: Uuid,
        request: UpdateSaleStatusRequest,
    ) -> Result<SaleResponse, ServiceError> {
        let sale = self.fetch(sale_id).await?;
        let old_status = parse_status(&sale.status)?;
        let new_status = request.status;

        if !is_valid_transition(old_status, new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot transition from '{}' to '{}'",
                old_status, new_status
            )));
        }

        let mut active: sale::ActiveModel = sale.clone().into();
        active.status = Set(new_status.to_string());
        if let Some(stage) = stage_for_status(new_status) {
            active.stage = Set(stage.to_string());
        }
        if let Some(ruc) = &request.ruc {
            active.ruc = Set(ruc.clone());
        }
        active.updated_at = Set(Some(Utc::now()));
        active.version = Set(sale.version + 1);

        let updated = active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(
            sale_id = %sale_id,
            old_status = %old_status,
            new_status = %new_status,
            "Sale status updated"
        );
        self.emit(Event::SaleStatusChanged {
            sale_id,
            old_status: old_status.to_string(),
            new_status: new_status.to_string(),
        })
        .await;

        if new_status == SaleStatus::Completed && old_status != SaleStatus::Completed {
            self.dispatch_print(&updated);
        }

        model_to_response(updated)
    }

    /// The kitchen's "ready" signal: moves the stage to `finished` without
    /// touching the business status.
    #[instrument(skip(self), fields(sale_id = %sale_id))]
    pub async fn mark_ready(&self, sale_id: Uuid) -> Result<SaleResponse, ServiceError> {
        let sale = self.fetch(sale_id).await?;

        let stage = parse_stage(&sale.stage)?;
        if stage == SaleStage::Closed {
            return Err(ServiceError::ValidationError(
                "a closed sale cannot be marked ready".to_string(),
            ));
        }

        let mut active: sale::ActiveModel = sale.clone().into();
        active.stage = Set(SaleStage::Finished.to_string());
        active.updated_at = Set(Some(Utc::now()));
        active.version = Set(sale.version + 1);

        let updated = active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        self.emit(Event::SaleReady(sale_id)).await;

        model_to_response(updated)
    }

    /// Invoices a sale exactly once against the currently active timbrado.
    #[instrument(skip(self), fields(sale_id = %sale_id))]
    pub async fn invoice_sale(&self, sale_id: Uuid) -> Result<SaleResponse, ServiceError> {
        let sale = self.fetch(sale_id).await?;
        let updated = self.apply_invoice(&sale).await?;
        model_to_response(updated)
    }

    /// Invoicing core: find the active timbrado, issue a number from it, then
    /// flip `invoiced` with a compare-and-set so a concurrent attempt on the
    /// same sale loses cleanly.
    async fn apply_invoice(&self, sale: &SaleModel) -> Result<SaleModel, ServiceError> {
        if sale.invoiced {
            return Err(ServiceError::AlreadyInvoiced(sale.id));
        }

        let now = Utc::now();
        let timbrado = self
            .timbrados
            .find_active(now)
            .await?
            .ok_or(ServiceError::NoActiveTimbrado)?;

        let issued = self.timbrados.issue_invoice_number(&timbrado).await?;

        let result = SaleEntity::update_many()
            .col_expr(sale::Column::Invoiced, Expr::value(true))
            .col_expr(
                sale::Column::InvoiceNumber,
                Expr::value(issued.invoice_number.clone()),
            )
            .col_expr(
                sale::Column::TimbradoNumber,
                Expr::value(issued.timbrado_code.clone()),
            )
            .col_expr(sale::Column::TimbradoInit, Expr::value(issued.timbrado_init))
            .col_expr(sale::Column::TimbradoId, Expr::value(issued.timbrado_id))
            .col_expr(sale::Column::UpdatedAt, Expr::value(now))
            .col_expr(
                sale::Column::Version,
                Expr::col(sale::Column::Version).add(1),
            )
            .filter(sale::Column::Id.eq(sale.id))
            .filter(sale::Column::Invoiced.eq(false))
            .exec(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected == 0 {
            warn!(sale_id = %sale.id, "Concurrent invoicing attempt lost the race");
            return Err(ServiceError::AlreadyInvoiced(sale.id));
        }

        info!(
            sale_id = %sale.id,
            invoice_number = %issued.invoice_number,
            timbrado = %issued.timbrado_code,
            "Sale invoiced"
        );
        self.emit(Event::SaleInvoiced {
            sale_id: sale.id,
            timbrado_code: issued.timbrado_code.clone(),
            invoice_number: issued.invoice_number.clone(),
        })
        .await;

        self.fetch(sale.id).await
    }

    async fn fetch(&self, sale_id: Uuid) -> Result<SaleModel, ServiceError> {
        SaleEntity::find_by_id(sale_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", sale_id)))
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send domain event");
            }
        }
    }

    /// Fire-and-forget: a completed sale prints the customer ticket, an open
    /// one prints the kitchen order, a closed one prints nothing.
    fn dispatch_print(&self, sale: &SaleModel) {
        let Some(queue) = &self.print_queue else {
            return;
        };

        let job = match parse_status(&sale.status) {
            Ok(SaleStatus::Completed) => PrintJob::CustomerTicket(ticket_payload(sale)),
            Ok(SaleStatus::Pending) | Ok(SaleStatus::Ordered) => {
                PrintJob::KitchenOrder(ticket_payload(sale))
            }
            _ => return,
        };
        queue.enqueue(job);
    }
}

fn parse_status(raw: &str) -> Result<SaleStatus, ServiceError> {
    raw.parse::<SaleStatus>()
        .map_err(|_| ServiceError::InternalError(format!("stored sale status '{}' is unknown", raw)))
}

fn parse_stage(raw: &str) -> Result<SaleStage, ServiceError> {
    raw.parse::<SaleStage>()
        .map_err(|_| ServiceError::InternalError(format!("stored sale stage '{}' is unknown", raw)))
}

fn parse_mode(raw: &str) -> Result<SaleMode, ServiceError> {
    raw.parse::<SaleMode>()
        .map_err(|_| ServiceError::InternalError(format!("stored sale mode '{}' is unknown", raw)))
}

/// Builds persisted line items from the request, recomputing the VAT portion
/// and rejecting declared amounts that disagree with the bracket.
fn build_line_items(requests: &[SaleItemRequest]) -> Result<Vec<LineItem>, ServiceError> {
    let mut items = Vec::with_capacity(requests.len());

    for (index, request) in requests.iter().enumerate() {
        if request.total_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "products[{}].total_price must not be negative",
                index
            )));
        }

        let computed = taxes::iva_amount(request.total_price, request.iva_rate);
        if let Some(declared) = request.iva_amount {
            if !taxes::declared_iva_is_consistent(declared, computed) {
                return Err(ServiceError::ValidationError(format!(
                    "products[{}].iva_amount ({}) is inconsistent with a {}% rate on {}",
                    index,
                    declared,
                    u32::from(request.iva_rate),
                    request.total_price
                )));
            }
        }

        items.push(LineItem {
            product_id: request.product_id,
            variant_id: request.variant_id,
            name: request.name.clone(),
            unit: request.unit.clone(),
            quantity: request.quantity,
            iva_rate: request.iva_rate,
            iva_amount: computed,
            total_price: request.total_price,
        });
    }

    Ok(items)
}

fn build_payments(requests: &[SalePaymentRequest], now: DateTime<Utc>) -> Vec<PaymentEntry> {
    requests
        .iter()
        .map(|request| PaymentEntry {
            payment_method: request.payment_method,
            total_amount: request.total_amount,
            date: request.date.unwrap_or(now),
        })
        .collect()
}

/// Payments may cover at most the sale total.
fn check_payment_bound(payments: &[PaymentEntry], total_amount: Decimal) -> Result<(), ServiceError> {
    for (index, entry) in payments.iter().enumerate() {
        if entry.total_amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "payment[{}].total_amount must not be negative",
                index
            )));
        }
    }

    let paid: Decimal = payments.iter().map(|p| p.total_amount).sum();
    if paid > total_amount {
        return Err(ServiceError::ValidationError(format!(
            "payments ({}) exceed the sale total ({})",
            paid, total_amount
        )));
    }
    Ok(())
}

fn model_to_response(model: SaleModel) -> Result<SaleResponse, ServiceError> {
    let status = parse_status(&model.status)?;
    let stage = parse_stage(&model.stage)?;
    let mode = parse_mode(&model.mode)?;

    Ok(SaleResponse {
        id: model.id,
        daily_id: model.daily_id,
        business_date: model.business_date,
        products: model.products.0,
        payment: model.payment.0,
        totals: model.totals,
        total_amount: model.total_amount,
        ruc: model.ruc,
        customer_name: model.customer_name,
        status,
        stage,
        mode,
        invoiced: model.invoiced,
        invoice_number: model.invoice_number,
        timbrado_number: model.timbrado_number,
        timbrado_init: model.timbrado_init,
        user_id: model.user_id,
        date: model.date,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn item_request(rate: u32, total: Decimal, declared: Option<Decimal>) -> SaleItemRequest {
        SaleItemRequest {
            product_id: Uuid::new_v4(),
            variant_id: None,
            name: "Chipa".to_string(),
            unit: None,
            quantity: 1,
            iva_rate: IvaRate::try_from(rate).unwrap(),
            iva_amount: declared,
            total_price: total,
        }
    }

    fn payment(amount: Decimal) -> PaymentEntry {
        PaymentEntry {
            payment_method: PaymentMethod::Cash,
            total_amount: amount,
            date: Utc::now(),
        }
    }

    #[test]
    fn line_items_recompute_iva() {
        let items =
            build_line_items(&[item_request(10, dec!(11000), None)]).unwrap();
        assert_eq!(items[0].iva_amount, dec!(1000));
    }

    #[test]
    fn consistent_declared_iva_is_accepted() {
        let items =
            build_line_items(&[item_request(10, dec!(11000), Some(dec!(1000)))]).unwrap();
        assert_eq!(items[0].iva_amount, dec!(1000));
    }

    #[test]
    fn inconsistent_declared_iva_is_rejected() {
        let result = build_line_items(&[item_request(10, dec!(11000), Some(dec!(500)))]);
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn negative_price_is_rejected() {
        let result = build_line_items(&[item_request(10, dec!(-100), None)]);
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn payments_may_not_exceed_total() {
        let payments = vec![payment(dec!(10000)), payment(dec!(7000))];
        let result = check_payment_bound(&payments, dec!(16500));
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn payments_below_or_equal_total_pass() {
        let payments = vec![payment(dec!(10000)), payment(dec!(6500))];
        assert!(check_payment_bound(&payments, dec!(16500)).is_ok());
        assert!(check_payment_bound(&[], dec!(16500)).is_ok());
    }

    #[test]
    fn negative_payment_is_rejected() {
        let result = check_payment_bound(&[payment(dec!(-1))], dec!(1000));
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn stored_model_round_trips_to_response() {
        let now = Utc::now();
        let model = SaleModel {
            id: Uuid::new_v4(),
            daily_id: 3,
            business_date: "2025-03-01".to_string(),
            products: LineItems(vec![]),
            payment: PaymentEntries(vec![]),
            totals: TaxTotals::default(),
            total_amount: dec!(0),
            ruc: "80012345-6".to_string(),
            customer_name: "Cliente".to_string(),
            status: "completed".to_string(),
            stage: "delivered".to_string(),
            mode: "carry".to_string(),
            invoiced: true,
            invoice_number: Some("001-001-000001".to_string()),
            timbrado_number: Some("12345678".to_string()),
            timbrado_init: Some(now),
            timbrado_id: Some(Uuid::new_v4()),
            user_id: "user-1".to_string(),
            date: now,
            created_at: now,
            updated_at: Some(now),
            version: 2,
        };

        let response = model_to_response(model).unwrap();
        assert_eq!(response.status, SaleStatus::Completed);
        assert_eq!(response.stage, SaleStage::Delivered);
        assert_eq!(response.mode, SaleMode::Carry);
        assert_eq!(response.invoice_number.as_deref(), Some("001-001-000001"));
    }

    #[test]
    fn unknown_stored_status_is_an_internal_error() {
        assert_matches!(parse_status("shipped"), Err(ServiceError::InternalError(_)));
    }
}
