use serde::Serialize;
use serde_json::Value;
use sqlx::types::time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Business {
    pub id: String,
    pub name: String,
    /// Human fallback number the agent transfers to.
    pub phone: Option<String>,
    pub industry: Option<String>,
    pub agent_id: Option<String>,
    pub phone_number: Option<String>,
    /// False while a purchased number still has to be linked to the agent.
    pub phone_number_linked: bool,
    pub ai_enabled: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBusiness {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub industry: Option<String>,
}

/// Fields an operator may change on an existing business.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusinessProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub industry: Option<String>,
}

impl BusinessProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.industry.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Call {
    pub id: Uuid,
    pub business_id: String,
    pub vendor_call_id: Option<String>,
    pub caller_phone: String,
    pub caller_name: Option<String>,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub duration_seconds: i32,
    pub recording_url: Option<String>,
    pub transcript: String,
    pub variables: Value,
    pub outcome: String,
    pub service_requested: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCall {
    pub business_id: String,
    pub vendor_call_id: Option<String>,
    pub caller_phone: String,
    pub caller_name: Option<String>,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub duration_seconds: i32,
    pub recording_url: Option<String>,
    pub transcript: String,
    pub variables: Value,
    pub outcome: String,
    pub service_requested: Option<String>,
}

/// Result of a call insert; a repeated vendor call id yields the row already on file.
#[derive(Debug, Clone, PartialEq)]
pub enum CallInsert {
    Created(Call),
    Duplicate(Call),
}

impl CallInsert {
    pub fn call(&self) -> &Call {
        match self {
            CallInsert::Created(c) | CallInsert::Duplicate(c) => c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub call_id: Option<Uuid>,
    pub business_id: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub service_type: Option<String>,
    pub scheduled_date: Date,
    pub scheduled_time: String,
    pub property_address: Option<String>,
    pub problem_description: String,
    pub status: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub call_id: Option<Uuid>,
    pub business_id: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub service_type: Option<String>,
    pub scheduled_date: Date,
    pub scheduled_time: String,
    pub property_address: Option<String>,
    pub problem_description: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub business_id: String,
    pub activity_type: String,
    pub description: String,
    pub metadata: Value,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub business_id: String,
    pub activity_type: String,
    pub description: String,
    pub metadata: Value,
}
