//! Request and response bodies for the Bland REST API.  The inbound webhook is deliberately not
//! modelled here; its shape varies by payload version and is read field-by-field in `normalize`.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CreateAgentPayload {
    pub name: String,
    pub prompt: String,
    pub first_message: String,
    pub voice: String,
    pub language: String,
    pub model: String,
    pub webhook: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_phone_number: Option<String>,
    pub record: bool,
    pub wait_for_greeting: bool,
    pub interruption_threshold: u32,
    /// Minutes.
    pub max_duration: u32,
    pub metadata: AgentMetadata,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AgentMetadata {
    pub business_id: String,
    pub business_name: String,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct UpdateAgentPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AgentResponse {
    pub agent_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct NumberSearchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_code: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NumberSearchResponse {
    #[serde(default)]
    pub numbers: Vec<AvailableNumber>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AvailableNumber {
    pub phone_number: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct PurchaseNumberPayload {
    pub phone_number: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PurchaseNumberResponse {
    pub phone_number: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct LinkNumberPayload {
    pub agent_id: String,
    pub webhook: String,
}
