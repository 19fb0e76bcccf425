use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Directory record as seen by the engine. The engine never writes these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "John Doe",
        "email": "john.doe@company.com",
        "rfid_tag": "RFID001",
        "active": true
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    /// Hardware identity key, case-sensitive.
    #[schema(example = "RFID001")]
    pub rfid_tag: String,

    #[schema(example = true)]
    pub active: bool,
}

impl Employee {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        email: impl Into<String>,
        rfid_tag: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            rfid_tag: rfid_tag.into(),
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
