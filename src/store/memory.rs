use super::{AttendanceStore, EmployeeDirectory, StoreResult};
use crate::error::StoreError;
use crate::model::{AttendanceSpan, Employee, NewSpan, SpanKey};
use chrono::{NaiveDate, NaiveDateTime};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError, RwLock};

// -------------------------
// Employee directory
// -------------------------

/// Directory held in process memory, keyed by tag.
#[derive(Default)]
pub struct MemoryDirectory {
    by_tag: RwLock<HashMap<String, Employee>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employees(employees: impl IntoIterator<Item = Employee>) -> StoreResult<Self> {
        let directory = Self::new();
        for employee in employees {
            directory.insert(employee)?;
        }
        Ok(directory)
    }

    /// Adds an employee, keeping tag, email, and id unique.
    pub fn insert(&self, employee: Employee) -> StoreResult<Employee> {
        let mut by_tag = self.by_tag.write().unwrap_or_else(PoisonError::into_inner);

        if by_tag.contains_key(&employee.rfid_tag) {
            return Err(StoreError::Conflict(format!(
                "tag `{}` is already assigned",
                employee.rfid_tag
            )));
        }
        if by_tag.values().any(|e| e.email == employee.email) {
            return Err(StoreError::Conflict(format!(
                "email `{}` is already registered",
                employee.email
            )));
        }
        if by_tag.values().any(|e| e.id == employee.id) {
            return Err(StoreError::Conflict(format!(
                "employee id {} is already taken",
                employee.id
            )));
        }

        by_tag.insert(employee.rfid_tag.clone(), employee.clone());
        Ok(employee)
    }

    /// Flips the active flag. Returns the updated record, or `None` if no
    /// employee has that id.
    pub fn set_active(&self, employee_id: u64, active: bool) -> Option<Employee> {
        let mut by_tag = self.by_tag.write().unwrap_or_else(PoisonError::into_inner);
        let employee = by_tag.values_mut().find(|e| e.id == employee_id)?;
        employee.active = active;
        Some(employee.clone())
    }
}

impl EmployeeDirectory for MemoryDirectory {
    fn lookup_by_tag<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, StoreResult<Option<Employee>>> {
        let found = self
            .by_tag
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tag)
            .cloned();
        async move { Ok(found) }.boxed()
    }
}

// -------------------------
// Attendance store
// -------------------------

#[derive(Default)]
struct SpanTable {
    spans: BTreeMap<u64, AttendanceSpan>,
    next_id: u64,
}

impl SpanTable {
    fn open_for(&self, key: SpanKey) -> Vec<&AttendanceSpan> {
        self.spans
            .values()
            .filter(|s| s.key() == key && s.is_open())
            .collect()
    }
}

/// Span storage under a single mutex, so create-if-no-open is atomic.
#[derive(Default)]
pub struct MemoryAttendanceStore {
    table: Mutex<SpanTable>,
}

impl MemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a span as-is, skipping the open-span check. Meant for importing
    /// historical rows; the id is reassigned.
    pub fn import_span(&self, mut span: AttendanceSpan) -> AttendanceSpan {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.next_id += 1;
        span.id = table.next_id;
        table.spans.insert(span.id, span.clone());
        span
    }

    pub fn all_spans(&self) -> Vec<AttendanceSpan> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.spans.values().cloned().collect()
    }

    fn with_table<T>(&self, f: impl FnOnce(&mut SpanTable) -> T) -> T {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut table)
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

impl AttendanceStore for MemoryAttendanceStore {
    fn find_open_span(&self, key: SpanKey) -> BoxFuture<'_, StoreResult<Option<AttendanceSpan>>> {
        let result = self.with_table(|table| {
            let open = table.open_for(key);
            match open.as_slice() {
                [] => Ok(None),
                [span] => Ok(Some((*span).clone())),
                many => Err(StoreError::CorruptOpenSpans {
                    key,
                    count: many.len(),
                }),
            }
        });
        async move { result }.boxed()
    }

    fn create_span(&self, new: NewSpan) -> BoxFuture<'_, StoreResult<AttendanceSpan>> {
        let result = self.with_table(|table| {
            if !table.open_for(new.key()).is_empty() {
                return Err(StoreError::OpenSpanExists(new.key()));
            }
            table.next_id += 1;
            let span = AttendanceSpan {
                id: table.next_id,
                employee_id: new.employee_id,
                date: new.date,
                opened_at: new.opened_at,
                closed_at: None,
                created_at: now(),
            };
            table.spans.insert(span.id, span.clone());
            Ok(span)
        });
        async move { result }.boxed()
    }

    fn close_span(
        &self,
        span_id: u64,
        closed_at: NaiveDateTime,
    ) -> BoxFuture<'_, StoreResult<AttendanceSpan>> {
        let result = self.with_table(|table| match table.spans.get_mut(&span_id) {
            Some(span) if span.is_open() => {
                span.closed_at = Some(closed_at);
                Ok(span.clone())
            }
            _ => Err(StoreError::SpanNotOpen(span_id)),
        });
        async move { result }.boxed()
    }

    fn find_span(&self, span_id: u64) -> BoxFuture<'_, StoreResult<Option<AttendanceSpan>>> {
        let span = self.with_table(|table| table.spans.get(&span_id).cloned());
        async move { Ok(span) }.boxed()
    }

    fn find_employee_spans(
        &self,
        employee_id: u64,
    ) -> BoxFuture<'_, StoreResult<Vec<AttendanceSpan>>> {
        let mut spans: Vec<AttendanceSpan> = self.with_table(|table| {
            table
                .spans
                .values()
                .filter(|s| s.employee_id == employee_id)
                .cloned()
                .collect()
        });
        spans.sort_by_key(|s| (s.date, s.opened_at, s.id));
        async move { Ok(spans) }.boxed()
    }

    fn find_spans(&self, key: SpanKey) -> BoxFuture<'_, StoreResult<Vec<AttendanceSpan>>> {
        let mut spans: Vec<AttendanceSpan> = self.with_table(|table| {
            table
                .spans
                .values()
                .filter(|s| s.key() == key)
                .cloned()
                .collect()
        });
        spans.sort_by_key(|s| (s.opened_at, s.id));
        async move { Ok(spans) }.boxed()
    }

    fn find_spans_between(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BoxFuture<'_, StoreResult<Vec<AttendanceSpan>>> {
        let mut spans: Vec<AttendanceSpan> = self.with_table(|table| {
            table
                .spans
                .values()
                .filter(|s| s.employee_id == employee_id && s.date >= start && s.date <= end)
                .cloned()
                .collect()
        });
        spans.sort_by_key(|s| (s.date, s.opened_at, s.id));
        async move { Ok(spans) }.boxed()
    }

    fn find_spans_on(&self, date: NaiveDate) -> BoxFuture<'_, StoreResult<Vec<AttendanceSpan>>> {
        let mut spans: Vec<AttendanceSpan> = self.with_table(|table| {
            table
                .spans
                .values()
                .filter(|s| s.date == date)
                .cloned()
                .collect()
        });
        spans.sort_by_key(|s| (s.employee_id, s.opened_at, s.id));
        async move { Ok(spans) }.boxed()
    }
}
