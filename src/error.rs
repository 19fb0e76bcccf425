use crate::model::SpanKey;
use chrono::NaiveDate;
use derive_more::Display;

/// How the invoking transport should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Bad payload or unknown/disabled badge. Fixable by the sender, never retried.
    CallerError,
    /// Expected business outcome (device retries, out-of-order delivery).
    Rejection,
    /// Stored state breaks the one-open-span rule. Needs an operator.
    Fatal,
    /// Backend I/O failed. Nothing was written.
    Unavailable,
}

// -------------------------
// Store
// -------------------------

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "an open span already exists for {}", _0)]
    OpenSpanExists(SpanKey),

    #[display(fmt = "span {} is not open", _0)]
    SpanNotOpen(u64),

    #[display(fmt = "{} open spans stored for {}", count, key)]
    CorruptOpenSpans { key: SpanKey, count: usize },

    #[display(fmt = "conflict: {}", _0)]
    Conflict(String),

    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

// -------------------------
// Validation
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ValidationError {
    #[display(fmt = "malformed payload: {}", _0)]
    MalformedPayload(String),

    #[display(fmt = "missing field `{}`", _0)]
    MissingField(&'static str),

    #[display(fmt = "field `{}` is blank", _0)]
    EmptyField(&'static str),

    #[display(fmt = "unrecognized event kind `{}`, expected CHECK_IN or CHECK_OUT", _0)]
    InvalidEventKind(String),

    #[display(fmt = "invalid timestamp `{}`, expected YYYY-MM-DDTHH:MM:SS", _0)]
    InvalidTimestamp(String),
}

impl std::error::Error for ValidationError {}

// -------------------------
// Resolution
// -------------------------

#[derive(Debug, Display)]
pub enum ResolutionError {
    #[display(fmt = "no employee owns tag `{}`", _0)]
    UnknownTag(String),

    #[display(fmt = "employee {} is inactive", _0)]
    InactiveEmployee(u64),

    #[display(fmt = "employee directory unavailable: {}", _0)]
    Directory(StoreError),
}

impl std::error::Error for ResolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolutionError::Directory(e) => Some(e),
            _ => None,
        }
    }
}

// -------------------------
// Reconciliation
// -------------------------

#[derive(Debug, Display)]
pub enum ReconcileError {
    #[display(fmt = "no open span for {}", _0)]
    NoOpenSpan(SpanKey),

    #[display(fmt = "{} already has an open span", _0)]
    DuplicateOpen(SpanKey),

    #[display(fmt = "invariant violation: {} open spans stored for {}", open_spans, key)]
    InvariantViolation { key: SpanKey, open_spans: usize },

    #[display(fmt = "attendance store unavailable: {}", _0)]
    Store(StoreError),
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::Store(e) => Some(e),
            _ => None,
        }
    }
}

// -------------------------
// Queries
// -------------------------

#[derive(Debug, Display)]
pub enum QueryError {
    #[display(fmt = "invalid range: start {} is after end {}", start, end)]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[display(fmt = "attendance store unavailable: {}", _0)]
    Store(StoreError),
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for QueryError {
    fn from(e: StoreError) -> Self {
        QueryError::Store(e)
    }
}

// -------------------------
// Pipeline
// -------------------------

/// Everything `AttendanceEngine::process` can return, grouped by stage.
#[derive(Debug, Display, derive_more::From)]
pub enum EngineError {
    #[display(fmt = "{}", _0)]
    Validation(ValidationError),

    #[display(fmt = "{}", _0)]
    Resolution(ResolutionError),

    #[display(fmt = "{}", _0)]
    Reconcile(ReconcileError),
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Validation(e) => Some(e),
            EngineError::Resolution(e) => Some(e),
            EngineError::Reconcile(e) => Some(e),
        }
    }
}

impl EngineError {
    pub fn severity(&self) -> Severity {
        match self {
            EngineError::Validation(_) => Severity::CallerError,
            EngineError::Resolution(ResolutionError::Directory(_)) => Severity::Unavailable,
            EngineError::Resolution(_) => Severity::CallerError,
            EngineError::Reconcile(ReconcileError::NoOpenSpan(_))
            | EngineError::Reconcile(ReconcileError::DuplicateOpen(_)) => Severity::Rejection,
            EngineError::Reconcile(ReconcileError::InvariantViolation { .. }) => Severity::Fatal,
            EngineError::Reconcile(ReconcileError::Store(_)) => Severity::Unavailable,
        }
    }

    /// Stable machine-readable name, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(e) => match e {
                ValidationError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
                ValidationError::MissingField(_) => "MISSING_FIELD",
                ValidationError::EmptyField(_) => "EMPTY_FIELD",
                ValidationError::InvalidEventKind(_) => "INVALID_EVENT_KIND",
                ValidationError::InvalidTimestamp(_) => "INVALID_TIMESTAMP",
            },
            EngineError::Resolution(e) => match e {
                ResolutionError::UnknownTag(_) => "UNKNOWN_TAG",
                ResolutionError::InactiveEmployee(_) => "INACTIVE_EMPLOYEE",
                ResolutionError::Directory(_) => "DIRECTORY_UNAVAILABLE",
            },
            EngineError::Reconcile(e) => match e {
                ReconcileError::NoOpenSpan(_) => "NO_OPEN_SPAN",
                ReconcileError::DuplicateOpen(_) => "DUPLICATE_OPEN",
                ReconcileError::InvariantViolation { .. } => "INVARIANT_VIOLATION",
                ReconcileError::Store(_) => "STORE_UNAVAILABLE",
            },
        }
    }
}

impl QueryError {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::InvalidRange { .. } => "INVALID_RANGE",
            QueryError::Store(_) => "STORE_UNAVAILABLE",
        }
    }
}
