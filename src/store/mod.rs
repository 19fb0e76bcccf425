//! Ports the engine consumes, and their in-memory and MySQL adapters.

pub mod memory;
pub mod mysql;

use crate::error::StoreError;
use crate::model::{AttendanceSpan, Employee, NewSpan, SpanKey};
use chrono::{NaiveDate, NaiveDateTime};
use futures::future::BoxFuture;

pub use memory::{MemoryAttendanceStore, MemoryDirectory};
pub use mysql::{SqlAttendanceStore, SqlEmployeeDirectory};

pub type StoreResult<T> = Result<T, StoreError>;

/// Read-only view of the employee directory.
pub trait EmployeeDirectory: Send + Sync {
    fn lookup_by_tag<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, StoreResult<Option<Employee>>>;
}

/// Durable storage for attendance spans.
pub trait AttendanceStore: Send + Sync {
    /// Zero or one open span for the key. More than one is reported as
    /// `StoreError::CorruptOpenSpans`, never resolved here.
    fn find_open_span(&self, key: SpanKey) -> BoxFuture<'_, StoreResult<Option<AttendanceSpan>>>;

    /// Atomically creates an open span unless one already exists for the key,
    /// in which case it returns `StoreError::OpenSpanExists`.
    fn create_span(&self, span: NewSpan) -> BoxFuture<'_, StoreResult<AttendanceSpan>>;

    /// Sets `closed_at` on a span that is still open, otherwise
    /// `StoreError::SpanNotOpen`.
    fn close_span(
        &self,
        span_id: u64,
        closed_at: NaiveDateTime,
    ) -> BoxFuture<'_, StoreResult<AttendanceSpan>>;

    fn find_span(&self, span_id: u64) -> BoxFuture<'_, StoreResult<Option<AttendanceSpan>>>;

    fn find_spans(&self, key: SpanKey) -> BoxFuture<'_, StoreResult<Vec<AttendanceSpan>>>;

    /// Every span of one employee, oldest day first.
    fn find_employee_spans(&self, employee_id: u64)
    -> BoxFuture<'_, StoreResult<Vec<AttendanceSpan>>>;

    /// Inclusive on both ends. Callers validate `start <= end`.
    fn find_spans_between(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BoxFuture<'_, StoreResult<Vec<AttendanceSpan>>>;

    /// All employees' spans on one date.
    fn find_spans_on(&self, date: NaiveDate) -> BoxFuture<'_, StoreResult<Vec<AttendanceSpan>>>;
}
