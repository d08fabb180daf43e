use crate::error::AppError;
use crate::pipeline::process_webhook;
use crate::prompt::{BusinessProfile, ServiceOffering};
use crate::provisioning::{self, AgentUpdate};
use crate::types::AppState;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{error, info, trace};

/// Parse a JSON body ourselves so every malformed body is a plain 400.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        error!(error=%e, "failed to deserialize request body");
        AppError::Validation(format!("invalid JSON body: {e}"))
    })
}

fn required(field: Option<String>, name: &str) -> Result<String, AppError> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

#[derive(Deserialize, Debug)]
pub struct WebhookQuery {
    pub business_id: Option<String>,
}

pub async fn bland_webhook(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<WebhookQuery>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let business_id = required(query.business_id, "business_id").map_err(|e| {
        error!("no business_id in webhook");
        e
    })?;
    let payload: Value = parse_body(&body)?;
    info!(business_id=%business_id, "webhook received");
    trace!(payload=%payload, "webhook payload");

    let receipt = process_webhook(
        app_state.store.as_ref(),
        &business_id,
        &payload,
        OffsetDateTime::now_utc(),
    )
    .await?;

    let mut resp = json!({
        "received": true,
        "call_id": receipt.call_id,
        "outcome": receipt.outcome,
    });
    if receipt.duplicate {
        resp["duplicate"] = json!(true);
    }
    Ok(Json(resp))
}

#[derive(Deserialize, Debug)]
pub struct CreateAgentRequest {
    pub business_id: Option<String>,
    pub business_name: Option<String>,
    pub industry: Option<String>,
    #[serde(default)]
    pub services: Vec<ServiceOffering>,
    pub pricing: Option<String>,
    pub special_instructions: Option<String>,
    pub provision_number: Option<bool>,
    pub area_code: Option<String>,
}

pub async fn create_agent(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let rq: CreateAgentRequest = parse_body(&body)?;
    let business_id = required(rq.business_id, "business_id")?;
    let business_name = required(rq.business_name, "business_name")?;
    let profile = BusinessProfile {
        business_name,
        industry: rq.industry,
        services: rq.services,
        pricing: rq.pricing,
        special_instructions: rq.special_instructions,
    };

    let created = provisioning::create_agent(&app_state, &business_id, &profile).await?;
    let mut warnings = created.warnings;
    let phone_number = if rq.provision_number.unwrap_or(true) {
        let provisioned = provisioning::provision_phone_number(
            &app_state,
            &business_id,
            rq.area_code.as_deref(),
        )
        .await?;
        warnings.extend(provisioned.warnings);
        Some(provisioned.phone_number)
    } else {
        None
    };

    Ok(Json(json!({
        "success": true,
        "agent_id": created.agent_id,
        "phone_number": phone_number,
        "warnings": warnings,
    })))
}

#[derive(Deserialize, Debug)]
pub struct ProvisionNumberRequest {
    pub business_id: Option<String>,
    pub area_code: Option<String>,
}

pub async fn provision_number(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let rq: ProvisionNumberRequest = parse_body(&body)?;
    let business_id = required(rq.business_id, "business_id")?;
    let provisioned =
        provisioning::provision_phone_number(&app_state, &business_id, rq.area_code.as_deref())
            .await?;
    Ok(Json(json!({
        "success": true,
        "phone_number": provisioned.phone_number,
        "warnings": provisioned.warnings,
    })))
}

#[derive(Deserialize, Debug)]
pub struct ToggleAgentRequest {
    pub business_id: Option<String>,
    pub enabled: Option<bool>,
}

pub async fn toggle_agent(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let rq: ToggleAgentRequest = parse_body(&body)?;
    let business_id = required(rq.business_id, "business_id")?;
    let enabled = rq
        .enabled
        .ok_or_else(|| AppError::Validation("enabled is required".to_string()))?;

    let toggled = provisioning::set_agent_enabled(&app_state, &business_id, enabled).await?;
    let message = if toggled.enabled {
        "AI agent activated"
    } else {
        "AI agent deactivated"
    };
    let mut resp = json!({
        "success": true,
        "enabled": toggled.enabled,
        "message": message,
    });
    if !toggled.warnings.is_empty() {
        resp["warnings"] = json!(toggled.warnings);
    }
    Ok(Json(resp))
}

#[derive(Deserialize, Debug)]
pub struct UpdateAgentRequest {
    pub business_id: Option<String>,
    pub business_name: Option<String>,
    pub phone_number: Option<String>,
    pub industry: Option<String>,
    #[serde(default)]
    pub services: Vec<ServiceOffering>,
    pub pricing: Option<String>,
    pub special_instructions: Option<String>,
}

pub async fn update_agent(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let rq: UpdateAgentRequest = parse_body(&body)?;
    let business_id = required(rq.business_id, "business_id")?;
    let update = AgentUpdate {
        business_name: rq.business_name.filter(|v| !v.trim().is_empty()),
        phone_number: rq.phone_number.filter(|v| !v.trim().is_empty()),
        industry: rq.industry.filter(|v| !v.trim().is_empty()),
        services: rq.services,
        pricing: rq.pricing,
        special_instructions: rq.special_instructions,
    };
    let warnings = provisioning::update_agent(&app_state, &business_id, &update).await?;
    Ok(Json(json!({
        "success": true,
        "message": "AI agent settings updated successfully",
        "warnings": warnings,
    })))
}

#[derive(Deserialize, Debug)]
pub struct EnsureBusinessRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub industry: Option<String>,
}

pub async fn ensure_business(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let rq: EnsureBusinessRequest = parse_body(&body)?;
    let (business, created) = provisioning::ensure_business(
        &app_state,
        rq.id.filter(|v| !v.trim().is_empty()),
        rq.name.filter(|v| !v.trim().is_empty()),
        rq.phone,
        rq.industry,
    )
    .await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(json!(business))))
}

async fn require_business(app_state: &AppState, business_id: &str) -> Result<(), AppError> {
    match app_state.store.get_business(business_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("business {business_id} not found"))),
    }
}

pub async fn list_calls(
    State(app_state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_business(&app_state, &business_id).await?;
    let calls = app_state.store.list_calls(&business_id).await?;
    Ok(Json(json!({ "calls": calls })))
}

pub async fn list_appointments(
    State(app_state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_business(&app_state, &business_id).await?;
    let appointments = app_state.store.list_appointments(&business_id).await?;
    Ok(Json(json!({ "appointments": appointments })))
}

pub async fn list_activity(
    State(app_state): State<Arc<AppState>>,
    Path(business_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_business(&app_state, &business_id).await?;
    let activity = app_state.store.list_activity(&business_id).await?;
    Ok(Json(json!({ "activity": activity })))
}
