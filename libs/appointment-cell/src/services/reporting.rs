// libs/appointment-cell/src/services/reporting.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use shared_config::AppConfig;

use crate::models::{AppointmentError, AppointmentPage, AppointmentStatus, PageQuery, ReportWindow};
use crate::services::collaborators::AppointmentStore;
use crate::services::supabase::SupabaseCollaborators;

pub const MAX_PAGE_SIZE: u32 = 100;

/// Completed-appointment counters and paginated status listings.
pub struct AppointmentReportingService {
    store: Arc<dyn AppointmentStore>,
    default_page_size: u32,
}

impl AppointmentReportingService {
    pub fn new(store: Arc<dyn AppointmentStore>, default_page_size: u32) -> Self {
        Self {
            store,
            default_page_size: default_page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn for_request(config: &AppConfig, auth_token: &str) -> Self {
        let collaborators = SupabaseCollaborators::new(config, auth_token);
        Self::new(collaborators.store, config.default_page_size)
    }

    pub async fn count_completed(&self, window: ReportWindow) -> Result<u64, AppointmentError> {
        self.count_completed_at(window, Utc::now()).await
    }

    /// Completed appointments created within `window` before `now`.
    pub async fn count_completed_at(
        &self,
        window: ReportWindow,
        now: DateTime<Utc>,
    ) -> Result<u64, AppointmentError> {
        let since = now - window.duration();
        let count = self.store
            .count_with_status_since(&[AppointmentStatus::Completed], since)
            .await?;

        debug!("{:?} completed count since {}: {}", window, since, count);
        Ok(count)
    }

    pub async fn completed_page(&self, query: PageQuery) -> Result<AppointmentPage, AppointmentError> {
        self.page(&[AppointmentStatus::Completed], query).await
    }

    /// Requested and Rescheduled appointments awaiting administrative action.
    pub async fn pending_page(&self, query: PageQuery) -> Result<AppointmentPage, AppointmentError> {
        self.page(&AppointmentStatus::PENDING, query).await
    }

    async fn page(
        &self,
        statuses: &[AppointmentStatus],
        query: PageQuery,
    ) -> Result<AppointmentPage, AppointmentError> {
        let (page, limit) = normalize_page(query, self.default_page_size);
        let offset = u64::from(page - 1) * u64::from(limit);

        let (appointments, total_count) = self.store
            .page_with_status(statuses, offset, limit)
            .await?;

        Ok(AppointmentPage {
            total_count,
            total_pages: total_count.div_ceil(u64::from(limit)),
            current_page: page,
            appointments,
        })
    }
}

/// Page is 1-indexed; a missing or zero limit falls back to the default and
/// large limits are capped.
pub fn normalize_page(query: PageQuery, default_limit: u32) -> (u32, u32) {
    let page = query.page.unwrap_or(1).max(1);
    let limit = match query.limit {
        None | Some(0) => default_limit,
        Some(limit) => limit,
    };
    (page, limit.clamp(1, MAX_PAGE_SIZE))
}
