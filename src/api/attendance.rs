use crate::engine::{AttendanceEngine, Reconciliation};
use crate::error::QueryError;
use crate::model::{AttendanceSpan, DailyReport, event::EventPayload};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use utoipa::IntoParams;

/// Device event ingestion endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/events",
    request_body = EventPayload,
    responses(
        (status = 201, description = "Span opened", body = AttendanceSpan),
        (status = 200, description = "Span closed", body = AttendanceSpan),
        (status = 400, description = "Payload failed validation", body = Object, example = json!({
            "error": "INVALID_TIMESTAMP",
            "message": "invalid timestamp `2024-10-30 08:00`, expected YYYY-MM-DDTHH:MM:SS"
        })),
        (status = 403, description = "Employee is inactive"),
        (status = 404, description = "No employee owns the tag"),
        (status = 409, description = "Already open, or nothing open to close", body = Object, example = json!({
            "error": "DUPLICATE_OPEN",
            "message": "employee 1 on 2024-10-30 already has an open span"
        })),
        (status = 429, description = "Too many requests"),
        (status = 500, description = "Stored state violates the one-open-span rule"),
        (status = 503, description = "Backend unavailable")
    ),
    tag = "Attendance"
)]
pub async fn ingest_event(
    engine: web::Data<AttendanceEngine>,
    body: web::Bytes,
) -> actix_web::Result<impl Responder> {
    debug!(bytes = body.len(), "Event received");

    let response = match engine.process(&body).await? {
        Reconciliation::Opened(span) => HttpResponse::Created().json(span),
        Reconciliation::Closed(span) => HttpResponse::Ok().json(span),
    };

    Ok(response)
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SpanQuery {
    /// Single day
    #[param(value_type = Option<String>, example = "2024-10-30")]
    pub date: Option<NaiveDate>,
    /// Range start, inclusive
    #[param(value_type = Option<String>, example = "2024-10-01")]
    pub start_date: Option<NaiveDate>,
    /// Range end, inclusive
    #[param(value_type = Option<String>, example = "2024-10-31")]
    pub end_date: Option<NaiveDate>,
}

/// Spans of one employee: a day, an inclusive date range, or the full
/// history when no dates are given
#[utoipa::path(
    get,
    path = "/api/v1/attendance/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        SpanQuery
    ),
    responses(
        (status = 200, description = "Matching spans", body = [AttendanceSpan]),
        (status = 400, description = "Missing or inverted date range", body = Object, example = json!({
            "error": "INVALID_RANGE",
            "message": "invalid range: start 2024-10-31 is after end 2024-10-01"
        })),
        (status = 503, description = "Backend unavailable")
    ),
    tag = "Attendance"
)]
pub async fn employee_spans(
    engine: web::Data<AttendanceEngine>,
    path: web::Path<u64>,
    query: web::Query<SpanQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    let spans = match (query.date, query.start_date, query.end_date) {
        (None, None, None) => engine.find_employee_spans(employee_id).await?,
        (Some(date), None, None) => engine.find_spans(employee_id, date).await?,
        (None, Some(start), Some(end)) => engine.find_spans_between(employee_id, start, end).await?,
        _ => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "error": "INVALID_QUERY",
                "message": "Provide `date`, both `start_date` and `end_date`, or neither"
            })));
        }
    };

    Ok(HttpResponse::Ok().json(spans))
}

/// One span by id
#[utoipa::path(
    get,
    path = "/api/v1/attendance/spans/{span_id}",
    params(
        ("span_id" = u64, Path, description = "Span ID")
    ),
    responses(
        (status = 200, description = "The span", body = AttendanceSpan),
        (status = 404, description = "No span with this id", body = Object, example = json!({
            "error": "SPAN_NOT_FOUND",
            "message": "Span 42 not found"
        })),
        (status = 503, description = "Backend unavailable")
    ),
    tag = "Attendance"
)]
pub async fn span_by_id(
    engine: web::Data<AttendanceEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let span_id = path.into_inner();

    match engine.find_span(span_id).await? {
        Some(span) => Ok(HttpResponse::Ok().json(span)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "error": "SPAN_NOT_FOUND",
            "message": format!("Span {span_id} not found")
        }))),
    }
}

/// Daily attendance report
#[utoipa::path(
    get,
    path = "/api/v1/reports/daily/{date}",
    params(
        ("date" = String, Path, description = "Calendar date, YYYY-MM-DD", example = "2024-10-30")
    ),
    responses(
        (status = 200, description = "Report for the day", body = DailyReport),
        (status = 404, description = "Date did not parse"),
        (status = 503, description = "Backend unavailable")
    ),
    tag = "Reports"
)]
pub async fn daily_report(
    engine: web::Data<AttendanceEngine>,
    path: web::Path<NaiveDate>,
) -> Result<HttpResponse, QueryError> {
    let report = engine.daily_report(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}
