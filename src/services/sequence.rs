//! Daily order numbering.
//!
//! One row per business day, incremented with a single conditional upsert so
//! concurrent sale creations can never observe the same value.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use std::sync::Arc;
use tracing::{error, instrument};

use crate::errors::ServiceError;

#[derive(Clone)]
pub struct DailySequenceService {
    db: Arc<DatabaseConnection>,
}

/// Calendar day a timestamp belongs to, shifted into the business timezone.
pub fn business_date(now: DateTime<Utc>, utc_offset_hours: i32) -> NaiveDate {
    (now + Duration::hours(utc_offset_hours as i64)).date_naive()
}

/// Counter key for a business day (`YYYY-MM-DD`).
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl DailySequenceService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Atomically increments and returns the counter for the given day.
    ///
    /// The upsert-and-increment runs as one statement; two concurrent calls
    /// for the same date serialize inside the store and return distinct,
    /// contiguous values starting at 1. A store failure aborts the caller:
    /// no sale is created without a daily id.
    #[instrument(skip(self), fields(date = %date))]
    pub async fn next_daily_id(&self, date: NaiveDate) -> Result<i64, ServiceError> {
        let key = date_key(date);
        let backend = self.db.get_database_backend();

        let sql = match backend {
            DbBackend::Postgres => {
                "INSERT INTO daily_counters (date, seq) VALUES ($1, 1) \
                 ON CONFLICT(date) DO UPDATE SET seq = daily_counters.seq + 1 \
                 RETURNING seq"
            }
            _ => {
                "INSERT INTO daily_counters (date, seq) VALUES (?, 1) \
                 ON CONFLICT(date) DO UPDATE SET seq = daily_counters.seq + 1 \
                 RETURNING seq"
            }
        };

        let stmt = Statement::from_sql_and_values(backend, sql, [key.clone().into()]);

        let row = self
            .db
            .query_one(stmt)
            .await
            .map_err(|e| {
                error!(error = %e, date = %key, "Failed to advance daily counter");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::InternalError("daily counter upsert returned no row".to_string())
            })?;

        let seq: i64 = row.try_get("", "seq").map_err(ServiceError::DatabaseError)?;
        Ok(seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn business_date_shifts_into_local_day() {
        // 02:30 UTC is still the previous evening in Asunción (UTC-3)
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 2, 30, 0).unwrap();
        assert_eq!(
            business_date(now, -3),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );

        // 03:00 UTC is exactly local midnight: a new business day
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 3, 0, 0).unwrap();
        assert_eq!(
            business_date(now, -3),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
    }

    #[test]
    fn business_date_with_zero_offset_is_utc_day() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 23, 59, 59).unwrap();
        assert_eq!(
            business_date(now, 0),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
    }

    #[test]
    fn date_key_is_iso_formatted() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(date_key(date), "2025-03-07");
    }
}
