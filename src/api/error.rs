use crate::error::{
    EngineError, QueryError, ReconcileError, ResolutionError, Severity,
};
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

fn error_body(status: StatusCode, kind: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(json!({
        "error": kind,
        "message": message
    }))
}

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::Resolution(ResolutionError::UnknownTag(_)) => StatusCode::NOT_FOUND,
            EngineError::Resolution(ResolutionError::InactiveEmployee(_)) => StatusCode::FORBIDDEN,
            EngineError::Reconcile(ReconcileError::NoOpenSpan(_))
            | EngineError::Reconcile(ReconcileError::DuplicateOpen(_)) => StatusCode::CONFLICT,
            EngineError::Reconcile(ReconcileError::InvariantViolation { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            EngineError::Resolution(ResolutionError::Directory(_))
            | EngineError::Reconcile(ReconcileError::Store(_)) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Backend details stay in the logs.
        let message = match self.severity() {
            Severity::Unavailable => "Attendance backend unavailable, retry later".to_string(),
            _ => self.to_string(),
        };
        error_body(self.status_code(), self.kind(), message)
    }
}

impl ResponseError for QueryError {
    fn status_code(&self) -> StatusCode {
        match self {
            QueryError::InvalidRange { .. } => StatusCode::BAD_REQUEST,
            QueryError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            QueryError::InvalidRange { .. } => self.to_string(),
            QueryError::Store(e) => {
                tracing::error!(error = %e, "Attendance query failed");
                "Attendance backend unavailable, retry later".to_string()
            }
        };
        error_body(self.status_code(), self.kind(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, ValidationError};
    use crate::model::SpanKey;
    use chrono::NaiveDate;

    fn key() -> SpanKey {
        SpanKey::new(1, NaiveDate::from_ymd_opt(2024, 10, 30).unwrap())
    }

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases: Vec<(EngineError, StatusCode)> = vec![
            (ValidationError::EmptyField("deviceId").into(), StatusCode::BAD_REQUEST),
            (
                ResolutionError::UnknownTag("X".to_string()).into(),
                StatusCode::NOT_FOUND,
            ),
            (ResolutionError::InactiveEmployee(1).into(), StatusCode::FORBIDDEN),
            (ReconcileError::DuplicateOpen(key()).into(), StatusCode::CONFLICT),
            (ReconcileError::NoOpenSpan(key()).into(), StatusCode::CONFLICT),
            (
                ReconcileError::InvariantViolation {
                    key: key(),
                    open_spans: 2,
                }
                .into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ReconcileError::Store(StoreError::Conflict("x".to_string())).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }

    #[test]
    fn inverted_range_is_a_bad_request() {
        let err = QueryError::InvalidRange {
            start: NaiveDate::from_ymd_opt(2024, 10, 31).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
