use crate::model::event::EventPayload;
use crate::model::{AttendanceSpan, DailyReport, Employee, EventKind};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Engine API",
        version = "0.1.0",
        description = r#"
## Attendance Engine

Turns badge (RFID) reads reported by field devices into attendance spans.

### 🔹 Rules
- Each employee has **at most one open span per calendar day**
- `CHECK_IN` opens a span, `CHECK_OUT` closes the open one
- The day is taken from the device's `occurredAt`, never from server time
- Inactive employees and unknown tags never produce a span

### 📦 Response Format
- JSON bodies
- Errors are `{"error": KIND, "message": text}`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::ingest_event,
        crate::api::attendance::employee_spans,
        crate::api::attendance::span_by_id,
        crate::api::attendance::daily_report
    ),
    components(
        schemas(
            EventPayload,
            EventKind,
            AttendanceSpan,
            DailyReport,
            Employee
        )
    ),
    tags(
        (name = "Attendance", description = "Event ingestion and span queries"),
        (name = "Reports", description = "Daily attendance reports"),
    )
)]
pub struct ApiDoc;
