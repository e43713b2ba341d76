//! Timbrado registry: fiscal authorization windows and invoice-number
//! issuance.
//!
//! A timbrado authorizes invoicing between `issued_at` and `expires_at` and
//! carries its own correlative counter. The counter only moves through a
//! conditional update so two concurrent invoicing requests can never receive
//! the same number.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, Set, Statement,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::timbrado::{self, Entity as TimbradoEntity, Model as TimbradoModel},
    errors::ServiceError,
    events::{Event, EventSender},
};

const DEFAULT_ESTABLISHMENT: &str = "001";
const DEFAULT_BRANCH: &str = "001";
const DEFAULT_MAX_INVOICES: i64 = 999_999;

/// Registration input for a new timbrado.
#[derive(Debug, Clone)]
pub struct RegisterTimbrado {
    pub code: String,
    pub issued_at: NaiveDate,
    pub expires_at: NaiveDate,
    pub establishment: Option<String>,
    pub branch: Option<String>,
    pub max_invoices: Option<i64>,
}

/// Result of one successful invoice-number issuance.
#[derive(Debug, Clone)]
pub struct IssuedInvoice {
    pub timbrado_id: Uuid,
    pub timbrado_code: String,
    pub timbrado_init: DateTime<Utc>,
    pub invoice_number: String,
    pub correlative: i64,
}

/// A timbrado becomes valid at the start of its issue date.
pub fn window_start(issued_at: NaiveDate) -> DateTime<Utc> {
    issued_at.and_hms_opt(0, 0, 0).expect("midnight exists").and_utc()
}

/// A timbrado is honored through the entirety of its expiration date, plus a
/// full day of grace: normalize to 23:59:59.999 of the day after.
pub fn window_end(expires_at: NaiveDate) -> DateTime<Utc> {
    let end_of_day = expires_at
        .and_hms_milli_opt(23, 59, 59, 999)
        .expect("end of day exists")
        .and_utc();
    end_of_day + Duration::days(1)
}

/// Paraguayan invoice number: `EEE-BBB-NNNNNN`.
pub fn format_invoice_number(establishment: &str, branch: &str, correlative: i64) -> String {
    format!("{}-{}-{:06}", establishment, branch, correlative)
}

fn validate_code(code: &str) -> Result<(), ServiceError> {
    if code.len() != 8 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::ValidationError(
            "timbrado code must be exactly 8 digits".to_string(),
        ));
    }
    Ok(())
}

fn validate_prefix(value: &str, field: &str) -> Result<(), ServiceError> {
    if value.len() != 3 || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::ValidationError(format!(
            "{} must be exactly 3 digits",
            field
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct TimbradoService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
}

impl TimbradoService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// The timbrado whose validity window contains `now`, if any. Should the
    /// registry ever hold overlapping windows the earliest-issued one wins.
    #[instrument(skip(self))]
    pub async fn find_active(&self, now: DateTime<Utc>) -> Result<Option<TimbradoModel>, ServiceError> {
        TimbradoEntity::find()
            .filter(timbrado::Column::IssuedAt.lte(now))
            .filter(timbrado::Column::ExpiresAt.gte(now))
            .order_by_asc(timbrado::Column::IssuedAt)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// All registered timbrados, newest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<TimbradoModel>, ServiceError> {
        TimbradoEntity::find()
            .order_by_desc(timbrado::Column::IssuedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    pub async fn get(&self, id: Uuid) -> Result<TimbradoModel, ServiceError> {
        TimbradoEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Timbrado {} not found", id)))
    }

    /// Registers a new timbrado. Fails with a conflict when another timbrado
    /// is active right now or the code is already registered.
    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn register(&self, request: RegisterTimbrado) -> Result<TimbradoModel, ServiceError> {
        validate_code(&request.code)?;

        let establishment = request
            .establishment
            .unwrap_or_else(|| DEFAULT_ESTABLISHMENT.to_string());
        let branch = request.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        validate_prefix(&establishment, "establishment")?;
        validate_prefix(&branch, "branch")?;

        let max_invoices = request.max_invoices.unwrap_or(DEFAULT_MAX_INVOICES);
        if max_invoices <= 0 {
            return Err(ServiceError::ValidationError(
                "max_invoices must be positive".to_string(),
            ));
        }

        let issued_at = window_start(request.issued_at);
        let expires_at = window_end(request.expires_at);
        if expires_at <= issued_at {
            return Err(ServiceError::ValidationError(
                "expires_at must not precede issued_at".to_string(),
            ));
        }

        let now = Utc::now();

        // Only one active window at a time; checked at registration.
        if let Some(active) = self.find_active(now).await? {
            warn!(code = %request.code, active = %active.code, "Rejecting timbrado: another is active");
            return Err(ServiceError::Conflict(
                "An active timbrado already exists".to_string(),
            ));
        }

        let duplicate = TimbradoEntity::find()
            .filter(timbrado::Column::Code.eq(request.code.clone()))
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Timbrado {} already exists",
                request.code
            )));
        }

        let model = timbrado::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(request.code.clone()),
            issued_at: Set(issued_at),
            expires_at: Set(expires_at),
            establishment: Set(establishment),
            branch: Set(branch),
            last_invoice_number: Set(0),
            max_invoices: Set(max_invoices),
            created_at: Set(now),
        };

        // The unique index on code backstops the duplicate check under races.
        let created = model.insert(&*self.db).await.map_err(|e| {
            ServiceError::from_db_err(e, &format!("Timbrado {} already exists", request.code))
        })?;

        info!(code = %created.code, timbrado_id = %created.id, "Timbrado registered");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::TimbradoRegistered {
                    timbrado_id: created.id,
                    code: created.code.clone(),
                })
                .await
            {
                warn!(error = %e, "Failed to send timbrado registered event");
            }
        }

        Ok(created)
    }

    /// Issues the next invoice number from a timbrado.
    ///
    /// The increment is one conditional UPDATE guarded by the quota and the
    /// validity window, so concurrent callers serialize inside the store and
    /// the correlative sequence has no gaps or repeats. When the update
    /// matches no row the timbrado is re-read to report the precise cause.
    #[instrument(skip(self, timbrado), fields(code = %timbrado.code))]
    pub async fn issue_invoice_number(
        &self,
        timbrado: &TimbradoModel,
    ) -> Result<IssuedInvoice, ServiceError> {
        let now = Utc::now();

        if !timbrado.is_active_at(now) {
            return Err(ServiceError::TimbradoExpired(timbrado.code.clone()));
        }
        if timbrado.last_invoice_number >= timbrado.max_invoices {
            return Err(ServiceError::InvoiceQuotaExceeded(timbrado.code.clone()));
        }

        let backend = self.db.get_database_backend();
        let sql = match backend {
            DbBackend::Postgres => {
                "UPDATE timbrados \
                 SET last_invoice_number = last_invoice_number + 1 \
                 WHERE id = $1 \
                   AND last_invoice_number < max_invoices \
                   AND issued_at <= $2 AND expires_at >= $2 \
                 RETURNING last_invoice_number"
            }
            _ => {
                "UPDATE timbrados \
                 SET last_invoice_number = last_invoice_number + 1 \
                 WHERE id = ? \
                   AND last_invoice_number < max_invoices \
                   AND issued_at <= ? AND expires_at >= ? \
                 RETURNING last_invoice_number"
            }
        };
        let values: Vec<sea_orm::Value> = match backend {
            DbBackend::Postgres => vec![timbrado.id.into(), now.into()],
            _ => vec![timbrado.id.into(), now.into(), now.into()],
        };
        let stmt = Statement::from_sql_and_values(backend, sql, values);

        let row = self.db.query_one(stmt).await.map_err(|e| {
            error!(error = %e, code = %timbrado.code, "Failed to advance invoice correlative");
            ServiceError::DatabaseError(e)
        })?;

        let correlative: i64 = match row {
            Some(row) => row.try_get("", "last_invoice_number")?,
            None => {
                // Lost a race or the window closed: re-read for the cause.
                let current = self.get(timbrado.id).await?;
                if current.last_invoice_number >= current.max_invoices {
                    return Err(ServiceError::InvoiceQuotaExceeded(current.code));
                }
                return Err(ServiceError::TimbradoExpired(current.code));
            }
        };

        let invoice_number =
            format_invoice_number(&timbrado.establishment, &timbrado.branch, correlative);

        info!(
            code = %timbrado.code,
            invoice_number = %invoice_number,
            "Invoice number issued"
        );

        Ok(IssuedInvoice {
            timbrado_id: timbrado.id,
            timbrado_code: timbrado.code.clone(),
            timbrado_init: timbrado.issued_at,
            invoice_number,
            correlative,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_timbrado() -> TimbradoModel {
        TimbradoModel {
            id: Uuid::new_v4(),
            code: "12345678".to_string(),
            issued_at: window_start(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            expires_at: window_end(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
            establishment: "001".to_string(),
            branch: "001".to_string(),
            last_invoice_number: 0,
            max_invoices: 999_999,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn invoice_number_is_zero_padded() {
        assert_eq!(format_invoice_number("001", "001", 1), "001-001-000001");
        assert_eq!(format_invoice_number("001", "001", 42), "001-001-000042");
        assert_eq!(
            format_invoice_number("001", "002", 999_999),
            "001-002-999999"
        );
    }

    #[test]
    fn expiry_covers_the_whole_final_day_plus_grace() {
        let end = window_end(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        // 23:59:59.999 of Feb 1st: one grace day past the nominal expiry
        assert_eq!(
            end,
            Utc.with_ymd_and_hms(2024, 2, 1, 23, 59, 59).unwrap()
                + Duration::milliseconds(999)
        );
    }

    #[test]
    fn window_boundaries_are_inclusive() {
        let t = sample_timbrado();
        assert!(t.is_active_at(t.issued_at));
        assert!(t.is_active_at(t.expires_at));
        assert!(!t.is_active_at(t.issued_at - Duration::milliseconds(1)));
        assert!(!t.is_active_at(t.expires_at + Duration::milliseconds(1)));
    }

    #[test]
    fn code_must_be_eight_digits() {
        assert!(validate_code("12345678").is_ok());
        assert!(validate_code("1234567").is_err());
        assert!(validate_code("123456789").is_err());
        assert!(validate_code("1234567a").is_err());
    }

    #[test]
    fn prefixes_must_be_three_digits() {
        assert!(validate_prefix("001", "branch").is_ok());
        assert!(validate_prefix("01", "branch").is_err());
        assert!(validate_prefix("00a", "branch").is_err());
    }
}
