use super::resolver::ActiveEmployee;
use crate::error::{ReconcileError, StoreError};
use crate::model::{AttendanceEvent, AttendanceSpan, EventKind, NewSpan, SpanKey};
use crate::store::AttendanceStore;
use crate::utils::KeyLocks;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a successful event did to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "span", rename_all = "snake_case")]
pub enum Reconciliation {
    Opened(AttendanceSpan),
    Closed(AttendanceSpan),
}

impl Reconciliation {
    pub fn span(&self) -> &AttendanceSpan {
        match self {
            Reconciliation::Opened(span) | Reconciliation::Closed(span) => span,
        }
    }

    pub fn into_span(self) -> AttendanceSpan {
        match self {
            Reconciliation::Opened(span) | Reconciliation::Closed(span) => span,
        }
    }
}

/// The per-(employee, date) open/closed state machine.
///
/// | state  | event | effect                 |
/// |--------|-------|------------------------|
/// | closed | open  | create span            |
/// | closed | close | `NoOpenSpan`           |
/// | open   | open  | `DuplicateOpen`        |
/// | open   | close | set `closed_at`        |
///
/// Both the date and the written timestamps come from the event's
/// `occurred_at`, never from the clock.
pub struct Reconciler {
    store: Arc<dyn AttendanceStore>,
    locks: KeyLocks,
}

impl Reconciler {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self {
            store,
            locks: KeyLocks::new(),
        }
    }

    pub async fn reconcile(
        &self,
        employee: &ActiveEmployee,
        event: &AttendanceEvent,
    ) -> Result<Reconciliation, ReconcileError> {
        let key = SpanKey::new(employee.id, event.date());
        self.locks
            .run(key, || self.apply(key, event.kind, event.occurred_at))
            .await
    }

    async fn apply(
        &self,
        key: SpanKey,
        kind: EventKind,
        at: NaiveDateTime,
    ) -> Result<Reconciliation, ReconcileError> {
        let open = self
            .store
            .find_open_span(key)
            .await
            .map_err(|e| from_store(key, e))?;

        debug!(%key, open = open.is_some(), %kind, "Current span state");

        match (open, kind) {
            (None, EventKind::Open) => {
                let span = self
                    .store
                    .create_span(NewSpan {
                        employee_id: key.employee_id,
                        date: key.date,
                        opened_at: at,
                    })
                    .await
                    .map_err(|e| from_store(key, e))?;
                Ok(Reconciliation::Opened(span))
            }
            (None, EventKind::Close) => Err(ReconcileError::NoOpenSpan(key)),
            (Some(_), EventKind::Open) => Err(ReconcileError::DuplicateOpen(key)),
            (Some(span), EventKind::Close) => {
                if at < span.opened_at {
                    warn!(
                        span_id = span.id,
                        opened_at = %span.opened_at,
                        closed_at = %at,
                        "Closing span before it opened, device clocks may disagree"
                    );
                }
                let span = self
                    .store
                    .close_span(span.id, at)
                    .await
                    .map_err(|e| from_store(key, e))?;
                Ok(Reconciliation::Closed(span))
            }
        }
    }
}

/// Store conflicts mean another writer won the race on this key.
fn from_store(key: SpanKey, e: StoreError) -> ReconcileError {
    match e {
        StoreError::OpenSpanExists(_) => ReconcileError::DuplicateOpen(key),
        StoreError::SpanNotOpen(_) => ReconcileError::NoOpenSpan(key),
        StoreError::CorruptOpenSpans { count, .. } => ReconcileError::InvariantViolation {
            key,
            open_spans: count,
        },
        other => ReconcileError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn key() -> SpanKey {
        SpanKey::new(3, NaiveDate::from_ymd_opt(2024, 10, 30).unwrap())
    }

    #[test]
    fn store_races_map_to_business_rejections() {
        assert!(matches!(
            from_store(key(), StoreError::OpenSpanExists(key())),
            ReconcileError::DuplicateOpen(_)
        ));
        assert!(matches!(
            from_store(key(), StoreError::SpanNotOpen(9)),
            ReconcileError::NoOpenSpan(_)
        ));
    }

    #[test]
    fn corrupt_storage_is_an_invariant_violation() {
        let err = from_store(
            key(),
            StoreError::CorruptOpenSpans {
                key: key(),
                count: 3,
            },
        );
        assert!(matches!(
            err,
            ReconcileError::InvariantViolation { open_spans: 3, .. }
        ));
    }

    #[test]
    fn other_store_failures_pass_through() {
        let err = from_store(key(), StoreError::Conflict("x".to_string()));
        assert!(matches!(err, ReconcileError::Store(_)));
    }
}
