use super::{AttendanceStore, EmployeeDirectory, StoreResult};
use crate::error::StoreError;
use crate::model::{AttendanceSpan, Employee, NewSpan, SpanKey};
use chrono::{NaiveDate, NaiveDateTime};
use futures::FutureExt;
use futures::future::BoxFuture;
use sqlx::MySqlPool;

/// Unique-index collisions only. SQLSTATE `23000` alone also covers
/// foreign-key and NOT NULL failures.
fn is_duplicate_key(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

// -------------------------
// Employee directory
// -------------------------

#[derive(Clone)]
pub struct SqlEmployeeDirectory {
    pool: MySqlPool,
}

impl SqlEmployeeDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

impl EmployeeDirectory for SqlEmployeeDirectory {
    fn lookup_by_tag<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, StoreResult<Option<Employee>>> {
        async move {
            let employee = sqlx::query_as::<_, Employee>(
                r#"
                SELECT id, name, email, rfid_tag, active
                FROM employees
                WHERE rfid_tag = ?
                "#,
            )
            .bind(tag)
            .fetch_optional(&self.pool)
            .await?;

            // Column collation may be case-insensitive; tags are not.
            Ok(employee.filter(|e| e.rfid_tag == tag))
        }
        .boxed()
    }
}

// -------------------------
// Attendance store
// -------------------------

/// Relies on the unique index over `(employee_id, date, open_marker)` from
/// `schema/mysql.sql` for the one-open-span rule.
#[derive(Clone)]
pub struct SqlAttendanceStore {
    pool: MySqlPool,
}

impl SqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_span(&self, span_id: u64) -> StoreResult<AttendanceSpan> {
        let span = sqlx::query_as::<_, AttendanceSpan>(
            r#"
            SELECT id, employee_id, `date`, opened_at, closed_at, created_at
            FROM attendance_spans
            WHERE id = ?
            "#,
        )
        .bind(span_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(span)
    }
}

impl AttendanceStore for SqlAttendanceStore {
    fn find_open_span(&self, key: SpanKey) -> BoxFuture<'_, StoreResult<Option<AttendanceSpan>>> {
        async move {
            let mut open = sqlx::query_as::<_, AttendanceSpan>(
                r#"
                SELECT id, employee_id, `date`, opened_at, closed_at, created_at
                FROM attendance_spans
                WHERE employee_id = ?
                AND `date` = ?
                AND closed_at IS NULL
                "#,
            )
            .bind(key.employee_id)
            .bind(key.date)
            .fetch_all(&self.pool)
            .await?;

            match open.len() {
                0 | 1 => Ok(open.pop()),
                count => Err(StoreError::CorruptOpenSpans { key, count }),
            }
        }
        .boxed()
    }

    fn create_span(&self, new: NewSpan) -> BoxFuture<'_, StoreResult<AttendanceSpan>> {
        async move {
            let result = sqlx::query(
                r#"
                INSERT INTO attendance_spans (employee_id, `date`, opened_at)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(new.employee_id)
            .bind(new.date)
            .bind(new.opened_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) => self.fetch_span(done.last_insert_id()).await,
                Err(e) if is_duplicate_key(&e) => Err(StoreError::OpenSpanExists(new.key())),
                Err(e) => Err(e.into()),
            }
        }
        .boxed()
    }

    fn close_span(
        &self,
        span_id: u64,
        closed_at: NaiveDateTime,
    ) -> BoxFuture<'_, StoreResult<AttendanceSpan>> {
        async move {
            let result = sqlx::query(
                r#"
                UPDATE attendance_spans
                SET closed_at = ?
                WHERE id = ?
                AND closed_at IS NULL
                "#,
            )
            .bind(closed_at)
            .bind(span_id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::SpanNotOpen(span_id));
            }

            self.fetch_span(span_id).await
        }
        .boxed()
    }

    fn find_span(&self, span_id: u64) -> BoxFuture<'_, StoreResult<Option<AttendanceSpan>>> {
        async move {
            let span = sqlx::query_as::<_, AttendanceSpan>(
                r#"
                SELECT id, employee_id, `date`, opened_at, closed_at, created_at
                FROM attendance_spans
                WHERE id = ?
                "#,
            )
            .bind(span_id)
            .fetch_optional(&self.pool)
            .await?;

            Ok(span)
        }
        .boxed()
    }

    fn find_employee_spans(
        &self,
        employee_id: u64,
    ) -> BoxFuture<'_, StoreResult<Vec<AttendanceSpan>>> {
        async move {
            let spans = sqlx::query_as::<_, AttendanceSpan>(
                r#"
                SELECT id, employee_id, `date`, opened_at, closed_at, created_at
                FROM attendance_spans
                WHERE employee_id = ?
                ORDER BY `date`, opened_at, id
                "#,
            )
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;

            Ok(spans)
        }
        .boxed()
    }

    fn find_spans(&self, key: SpanKey) -> BoxFuture<'_, StoreResult<Vec<AttendanceSpan>>> {
        async move {
            let spans = sqlx::query_as::<_, AttendanceSpan>(
                r#"
                SELECT id, employee_id, `date`, opened_at, closed_at, created_at
                FROM attendance_spans
                WHERE employee_id = ?
                AND `date` = ?
                ORDER BY opened_at, id
                "#,
            )
            .bind(key.employee_id)
            .bind(key.date)
            .fetch_all(&self.pool)
            .await?;

            Ok(spans)
        }
        .boxed()
    }

    fn find_spans_between(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BoxFuture<'_, StoreResult<Vec<AttendanceSpan>>> {
        async move {
            let spans = sqlx::query_as::<_, AttendanceSpan>(
                r#"
                SELECT id, employee_id, `date`, opened_at, closed_at, created_at
                FROM attendance_spans
                WHERE employee_id = ?
                AND `date` BETWEEN ? AND ?
                ORDER BY `date`, opened_at, id
                "#,
            )
            .bind(employee_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

            Ok(spans)
        }
        .boxed()
    }

    fn find_spans_on(&self, date: NaiveDate) -> BoxFuture<'_, StoreResult<Vec<AttendanceSpan>>> {
        async move {
            let spans = sqlx::query_as::<_, AttendanceSpan>(
                r#"
                SELECT id, employee_id, `date`, opened_at, closed_at, created_at
                FROM attendance_spans
                WHERE `date` = ?
                ORDER BY employee_id, opened_at, id
                "#,
            )
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

            Ok(spans)
        }
        .boxed()
    }
}
