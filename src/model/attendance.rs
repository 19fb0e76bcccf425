use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One presence interval for one employee on one calendar date.
///
/// `closed_at == None` means the span is open. `opened_at` never changes after
/// creation and `closed_at` is written at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_id": 1,
        "date": "2024-10-30",
        "opened_at": "2024-10-30T08:00:00",
        "closed_at": "2024-10-30T17:00:00",
        "created_at": "2024-10-30T08:00:02"
    })
)]
pub struct AttendanceSpan {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub employee_id: u64,

    #[schema(example = "2024-10-30", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "2024-10-30T08:00:00", value_type = String, format = "date-time")]
    pub opened_at: NaiveDateTime,

    #[schema(example = "2024-10-30T17:00:00", value_type = String, format = "date-time", nullable = true)]
    pub closed_at: Option<NaiveDateTime>,

    /// Record creation time, assigned by the store.
    #[schema(example = "2024-10-30T08:00:02", value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

impl AttendanceSpan {
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    pub fn key(&self) -> SpanKey {
        SpanKey::new(self.employee_id, self.date)
    }
}

/// Input to `AttendanceStore::create_span`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewSpan {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub opened_at: NaiveDateTime,
}

impl NewSpan {
    pub fn key(&self) -> SpanKey {
        SpanKey::new(self.employee_id, self.date)
    }
}

/// The `(employee, date)` pair the open/closed state machine is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanKey {
    pub employee_id: u64,
    pub date: NaiveDate,
}

impl SpanKey {
    pub fn new(employee_id: u64, date: NaiveDate) -> Self {
        Self { employee_id, date }
    }
}

impl std::fmt::Display for SpanKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "employee {} on {}", self.employee_id, self.date)
    }
}

/// Per-day summary across all employees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[schema(example = json!({
    "date": "2024-10-30",
    "employees": 2,
    "spans": 3,
    "checked_out": 2,
    "still_present": 1,
    "attendances": []
}))]
pub struct DailyReport {
    #[schema(example = "2024-10-30", value_type = String, format = "date")]
    pub date: NaiveDate,
    /// Distinct employees with at least one span that day.
    pub employees: usize,
    pub spans: usize,
    pub checked_out: usize,
    pub still_present: usize,
    pub attendances: Vec<AttendanceSpan>,
}

impl DailyReport {
    pub fn from_spans(date: NaiveDate, attendances: Vec<AttendanceSpan>) -> Self {
        let mut employees: Vec<u64> = attendances.iter().map(|s| s.employee_id).collect();
        employees.sort_unstable();
        employees.dedup();

        let still_present = attendances.iter().filter(|s| s.is_open()).count();

        Self {
            date,
            employees: employees.len(),
            spans: attendances.len(),
            checked_out: attendances.len() - still_present,
            still_present,
            attendances,
        }
    }
}
