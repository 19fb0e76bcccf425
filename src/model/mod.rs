pub mod attendance;
pub mod employee;
pub mod event;

pub use attendance::{AttendanceSpan, DailyReport, NewSpan, SpanKey};
pub use employee::Employee;
pub use event::{AttendanceEvent, EventKind};
