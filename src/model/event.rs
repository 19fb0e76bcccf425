use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Whether a badge read starts or ends a span. The wire tokens are
/// `CHECK_IN` and `CHECK_OUT`, matched exactly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
pub enum EventKind {
    #[strum(serialize = "CHECK_IN")]
    #[serde(rename = "CHECK_IN")]
    Open,
    #[strum(serialize = "CHECK_OUT")]
    #[serde(rename = "CHECK_OUT")]
    Close,
}

/// A fully validated badge event. Only `validator::validate` builds these
/// from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceEvent {
    pub device_id: String,
    pub rfid_tag: String,
    pub kind: EventKind,
    /// Device-reported time, the only time the reconciler looks at.
    pub occurred_at: NaiveDateTime,
    pub metadata: Option<String>,
}

impl AttendanceEvent {
    pub fn date(&self) -> NaiveDate {
        self.occurred_at.date()
    }
}

/// Wire shape of an inbound event, for API docs. Parsing goes through the
/// validator, never through serde into this type.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    #[schema(example = "D1")]
    pub device_id: String,
    #[schema(example = "RFID001")]
    pub rfid_tag: String,
    #[schema(example = "CHECK_IN")]
    pub kind: EventKind,
    #[schema(example = "2024-10-30T08:00:00", value_type = String, format = "date-time")]
    pub occurred_at: String,
    #[schema(example = "battery=87", nullable = true)]
    pub metadata: Option<String>,
}
