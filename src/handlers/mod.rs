pub mod sales;
pub mod timbrados;

use std::sync::Arc;

use tracing::warn;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::models::sale::SaleStatus;
use crate::services::printing::PrintQueue;
use crate::services::sales::SaleService;
use crate::services::sequence::DailySequenceService;
use crate::services::timbrados::TimbradoService;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub sales: Arc<SaleService>,
    pub timbrados: Arc<TimbradoService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        print_queue: PrintQueue,
        config: &AppConfig,
    ) -> Self {
        let sequence = DailySequenceService::new(db_pool.clone());
        let timbrados = TimbradoService::new(db_pool.clone(), Some(event_sender.clone()));

        let default_status = config
            .default_sale_status
            .parse::<SaleStatus>()
            .unwrap_or_else(|_| {
                warn!(
                    configured = %config.default_sale_status,
                    "Unknown default sale status; falling back to pending"
                );
                SaleStatus::Pending
            });

        let sales = Arc::new(SaleService::new(
            db_pool,
            sequence,
            timbrados.clone(),
            Some(event_sender),
            Some(print_queue),
            default_status,
            config.business_utc_offset_hours,
        ));

        Self {
            sales,
            timbrados: Arc::new(timbrados),
        }
    }
}
