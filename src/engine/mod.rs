//! Event validation and reconciliation.
//!
//! `raw payload → validate → resolve → reconcile → span`. Identity is
//! resolved before the per-key lock is taken, so directory I/O never runs
//! under it.

pub mod reconciler;
pub mod resolver;
pub mod validator;

pub use reconciler::{Reconciler, Reconciliation};
pub use resolver::{ActiveEmployee, IdentityResolver};
pub use validator::validate;

use crate::error::{EngineError, QueryError, Severity};
use crate::model::{AttendanceEvent, AttendanceSpan, DailyReport, SpanKey};
use crate::store::{AttendanceStore, EmployeeDirectory};
use crate::utils::TagCache;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Span, error, info, instrument};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Zero disables the identity cache.
    pub tag_cache_ttl: Duration,
    pub tag_cache_capacity: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tag_cache_ttl: Duration::ZERO,
            tag_cache_capacity: 10_000,
        }
    }
}

pub struct AttendanceEngine {
    resolver: IdentityResolver,
    reconciler: Reconciler,
    store: Arc<dyn AttendanceStore>,
}

impl AttendanceEngine {
    pub fn new(
        directory: Arc<dyn EmployeeDirectory>,
        store: Arc<dyn AttendanceStore>,
        options: EngineOptions,
    ) -> Self {
        let cache = TagCache::new(options.tag_cache_ttl, options.tag_cache_capacity);

        Self {
            resolver: IdentityResolver::new(directory, cache),
            reconciler: Reconciler::new(store.clone()),
            store,
        }
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Validates, resolves, and reconciles one raw event.
    #[instrument(
        name = "attendance_process",
        skip(self, raw),
        fields(
            event_id = %uuid::Uuid::new_v4(),
            device_id = tracing::field::Empty,
            rfid_tag = tracing::field::Empty,
            kind = tracing::field::Empty,
        )
    )]
    pub async fn process(&self, raw: &[u8]) -> Result<Reconciliation, EngineError> {
        let result = match validate(raw) {
            Ok(event) => self.apply(&event).await,
            Err(e) => Err(e.into()),
        };
        log_outcome(&result);
        result
    }

    /// Same as `process` for adapters that already hold a validated event.
    #[instrument(
        name = "attendance_handle",
        skip(self, event),
        fields(
            event_id = %uuid::Uuid::new_v4(),
            device_id = tracing::field::Empty,
            rfid_tag = tracing::field::Empty,
            kind = tracing::field::Empty,
        )
    )]
    pub async fn handle(&self, event: &AttendanceEvent) -> Result<Reconciliation, EngineError> {
        let result = self.apply(event).await;
        log_outcome(&result);
        result
    }

    async fn apply(&self, event: &AttendanceEvent) -> Result<Reconciliation, EngineError> {
        let span = Span::current();
        span.record("device_id", event.device_id.as_str());
        span.record("rfid_tag", event.rfid_tag.as_str());
        let kind: &str = event.kind.as_ref();
        span.record("kind", kind);

        let employee = self.resolver.resolve(&event.rfid_tag).await?;
        let outcome = self.reconciler.reconcile(&employee, event).await?;
        Ok(outcome)
    }

    // -------------------------
    // Queries
    // -------------------------

    pub async fn find_span(&self, span_id: u64) -> Result<Option<AttendanceSpan>, QueryError> {
        Ok(self.store.find_span(span_id).await?)
    }

    /// Full history of one employee.
    pub async fn find_employee_spans(
        &self,
        employee_id: u64,
    ) -> Result<Vec<AttendanceSpan>, QueryError> {
        Ok(self.store.find_employee_spans(employee_id).await?)
    }

    pub async fn find_spans(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceSpan>, QueryError> {
        Ok(self
            .store
            .find_spans(SpanKey::new(employee_id, date))
            .await?)
    }

    /// Inclusive range; `start` after `end` is `InvalidRange`.
    pub async fn find_spans_between(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceSpan>, QueryError> {
        if start > end {
            return Err(QueryError::InvalidRange { start, end });
        }
        Ok(self
            .store
            .find_spans_between(employee_id, start, end)
            .await?)
    }

    pub async fn daily_report(&self, date: NaiveDate) -> Result<DailyReport, QueryError> {
        let spans = self.store.find_spans_on(date).await?;
        Ok(DailyReport::from_spans(date, spans))
    }
}

fn log_outcome(result: &Result<Reconciliation, EngineError>) {
    match result {
        Ok(Reconciliation::Opened(span)) => {
            info!(span_id = span.id, employee_id = span.employee_id, date = %span.date, "Span opened");
        }
        Ok(Reconciliation::Closed(span)) => {
            info!(span_id = span.id, employee_id = span.employee_id, date = %span.date, "Span closed");
        }
        Err(e) => match e.severity() {
            Severity::CallerError => info!(error = %e, kind = e.kind(), "Event rejected"),
            Severity::Rejection => info!(error = %e, kind = e.kind(), "Event not applied"),
            Severity::Fatal => error!(
                error = %e,
                kind = e.kind(),
                alert = true,
                "Stored attendance state is corrupt, key needs operator repair"
            ),
            Severity::Unavailable => error!(error = %e, kind = e.kind(), "Attendance backend failure"),
        },
    }
}
