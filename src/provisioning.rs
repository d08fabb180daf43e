use crate::bland_types::{AgentMetadata, CreateAgentPayload, LinkNumberPayload, UpdateAgentPayload};
use crate::db_types::{Business, BusinessProfileUpdate, NewActivity, NewBusiness};
use crate::error::{log_store_error, AppError, PartialSuccessWarning};
use crate::prompt::{build_agent_prompt, first_message, BusinessProfile, ServiceOffering};
use crate::store::Store;
use crate::types::AppState;

use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DEFAULT_BUSINESS_NAME: &str = "My Septic Company";
pub const DEFAULT_INDUSTRY: &str = "Septic Services";

const AGENT_VOICE: &str = "professional";
const AGENT_MODEL: &str = "enhanced";
const AGENT_LANGUAGE: &str = "en";
const AGENT_INTERRUPTION_THRESHOLD: u32 = 100;
const AGENT_MAX_DURATION_MINUTES: u32 = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct AgentCreated {
    pub agent_id: String,
    pub warnings: Vec<PartialSuccessWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberProvisioned {
    pub phone_number: String,
    pub warnings: Vec<PartialSuccessWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentToggled {
    pub enabled: bool,
    pub warnings: Vec<PartialSuccessWarning>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentUpdate {
    pub business_name: Option<String>,
    pub phone_number: Option<String>,
    pub industry: Option<String>,
    pub services: Vec<ServiceOffering>,
    pub pricing: Option<String>,
    pub special_instructions: Option<String>,
}

async fn load_business(store: &dyn Store, business_id: &str) -> Result<Business, AppError> {
    store
        .get_business(business_id)
        .await
        .map_err(|e| {
            log_store_error("failed to look up business", &e);
            AppError::from(e)
        })?
        .ok_or_else(|| AppError::NotFound(format!("business {business_id} not found")))
}

/// Best-effort activity log append; a failure becomes a warning.
async fn record_activity(
    store: &dyn Store,
    business_id: &str,
    activity_type: &str,
    description: String,
    metadata: Value,
    warnings: &mut Vec<PartialSuccessWarning>,
) {
    let entry = NewActivity {
        business_id: business_id.to_string(),
        activity_type: activity_type.to_string(),
        description,
        metadata,
    };
    if let Err(e) = store.append_activity(&entry).await {
        warnings.push(PartialSuccessWarning::new("failed to append activity log", e));
    }
}

/// Create the business if it does not exist yet.  Returns the row and whether it was created.
pub async fn ensure_business(
    state: &AppState,
    id: Option<String>,
    name: Option<String>,
    phone: Option<String>,
    industry: Option<String>,
) -> Result<(Business, bool), AppError> {
    let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let _guard = state.business_locks.acquire(&id).await;
    let store = state.store.as_ref();
    if let Some(existing) = store.get_business(&id).await? {
        info!(business_id=%id, "business already exists");
        return Ok((existing, false));
    }
    let business = store
        .create_business(&NewBusiness {
            id: id.clone(),
            name: name.unwrap_or_else(|| DEFAULT_BUSINESS_NAME.to_string()),
            phone,
            industry: Some(industry.unwrap_or_else(|| DEFAULT_INDUSTRY.to_string())),
        })
        .await
        .map_err(|e| {
            log_store_error("failed to create business", &e);
            AppError::from(e)
        })?;
    info!(business_id=%business.id, "business created");
    Ok((business, true))
}

/// Register a voice agent for the business with the vendor.  One agent per business.
pub async fn create_agent(
    state: &AppState,
    business_id: &str,
    profile: &BusinessProfile,
) -> Result<AgentCreated, AppError> {
    let _guard = state.business_locks.acquire(business_id).await;
    let store = state.store.as_ref();
    let business = load_business(store, business_id).await?;
    if let Some(agent_id) = &business.agent_id {
        return Err(AppError::Conflict(format!(
            "business {business_id} already has agent {agent_id}"
        )));
    }

    info!(business_id=%business_id, name=%profile.business_name, "creating voice agent");
    let payload = CreateAgentPayload {
        name: format!("{} AI Assistant", profile.business_name),
        prompt: build_agent_prompt(profile),
        first_message: first_message(profile),
        voice: AGENT_VOICE.to_string(),
        language: AGENT_LANGUAGE.to_string(),
        model: AGENT_MODEL.to_string(),
        webhook: state.config.webhook_url(business_id),
        transfer_phone_number: business.phone.clone(),
        record: true,
        wait_for_greeting: false,
        interruption_threshold: AGENT_INTERRUPTION_THRESHOLD,
        max_duration: AGENT_MAX_DURATION_MINUTES,
        metadata: AgentMetadata {
            business_id: business_id.to_string(),
            business_name: profile.business_name.clone(),
        },
    };
    let agent_id = state.vendor.create_agent(&payload).await?;

    store.bind_agent(business_id, &agent_id).await.map_err(|e| {
        error!(error=%e, agent_id=%agent_id, "agent created at vendor but not recorded");
        AppError::from(e)
    })?;
    info!(business_id=%business_id, agent_id=%agent_id, "voice agent created");

    let mut warnings = vec![];
    record_activity(
        store,
        business_id,
        "agent_created",
        "AI agent created".to_string(),
        json!({ "agent_id": agent_id }),
        &mut warnings,
    )
    .await;
    Ok(AgentCreated { agent_id, warnings })
}

/// Search, purchase, and link a phone number to the business's agent.
///
/// A purchased number is recorded before linking is attempted; if linking fails the next call
/// retries only the link step.
pub async fn provision_phone_number(
    state: &AppState,
    business_id: &str,
    area_code: Option<&str>,
) -> Result<NumberProvisioned, AppError> {
    let _guard = state.business_locks.acquire(business_id).await;
    let store = state.store.as_ref();
    let vendor = state.vendor.as_ref();
    let business = load_business(store, business_id).await?;
    let agent_id = business
        .agent_id
        .clone()
        .ok_or_else(|| AppError::NotFound(format!("business {business_id} has no AI agent")))?;

    let phone_number = match (&business.phone_number, business.phone_number_linked) {
        (Some(number), true) => {
            return Err(AppError::Conflict(format!(
                "business {business_id} already has phone number {number}"
            )));
        }
        (Some(number), false) => {
            info!(business_id=%business_id, number=%number, "retrying link for purchased number");
            number.clone()
        }
        (None, _) => {
            let candidates = vendor.search_numbers(area_code).await?;
            let candidate = candidates.into_iter().next().ok_or_else(|| AppError::Vendor {
                message: format!(
                    "no phone numbers available{}",
                    area_code
                        .map(|a| format!(" in area code {a}"))
                        .unwrap_or_default()
                ),
                retryable: false,
            })?;
            let purchased = vendor.purchase_number(&candidate).await?;
            info!(business_id=%business_id, number=%purchased, "phone number purchased");
            store
                .set_phone_number(business_id, &purchased, false)
                .await
                .map_err(|e| {
                    error!(error=%e, number=%purchased, "number purchased but not recorded");
                    AppError::from(e)
                })?;
            purchased
        }
    };

    let link = LinkNumberPayload {
        agent_id: agent_id.clone(),
        webhook: state.config.webhook_url(business_id),
    };
    if let Err(e) = vendor.link_number(&phone_number, &link).await {
        warn!(error=%e, number=%phone_number, "number purchased but not linked");
        return Err(AppError::Vendor {
            retryable: true,
            message: format!(
                "phone number {phone_number} was purchased but could not be linked to the agent ({e}); retry to link it"
            ),
        });
    }
    store
        .set_phone_number(business_id, &phone_number, true)
        .await
        .map_err(|e| {
            log_store_error("failed to mark phone number linked", &e);
            AppError::from(e)
        })?;
    info!(business_id=%business_id, number=%phone_number, "phone number linked");

    let mut warnings = vec![];
    record_activity(
        store,
        business_id,
        "number_provisioned",
        format!("AI phone number {phone_number} provisioned"),
        json!({ "agent_id": agent_id, "phone_number": phone_number }),
        &mut warnings,
    )
    .await;
    Ok(NumberProvisioned {
        phone_number,
        warnings,
    })
}

/// Switch the AI receptionist on or off.  The local flag is authoritative; failing to sync the
/// vendor's agent is only a warning.
pub async fn set_agent_enabled(
    state: &AppState,
    business_id: &str,
    enabled: bool,
) -> Result<AgentToggled, AppError> {
    let _guard = state.business_locks.acquire(business_id).await;
    let store = state.store.as_ref();
    let business = load_business(store, business_id).await?;

    store
        .set_ai_enabled(business_id, enabled)
        .await
        .map_err(|e| {
            log_store_error("failed to update AI status", &e);
            AppError::from(e)
        })?;
    info!(business_id=%business_id, enabled, "AI status updated");

    let mut warnings = vec![];
    if let Some(agent_id) = &business.agent_id {
        if let Err(e) = state.vendor.set_agent_active(agent_id, enabled).await {
            warnings.push(PartialSuccessWarning::new(
                "failed to sync agent status with vendor",
                e,
            ));
        }
    }
    let (activity_type, description) = if enabled {
        ("agent_enabled", "AI agent activated")
    } else {
        ("agent_disabled", "AI agent deactivated")
    };
    record_activity(
        store,
        business_id,
        activity_type,
        description.to_string(),
        json!({ "agent_id": business.agent_id, "enabled": enabled }),
        &mut warnings,
    )
    .await;
    Ok(AgentToggled { enabled, warnings })
}

/// Push a rebuilt prompt to the vendor, then save whichever profile fields changed.
pub async fn update_agent(
    state: &AppState,
    business_id: &str,
    update: &AgentUpdate,
) -> Result<Vec<PartialSuccessWarning>, AppError> {
    let _guard = state.business_locks.acquire(business_id).await;
    let store = state.store.as_ref();
    let business = load_business(store, business_id).await?;
    let agent_id = business.agent_id.clone().ok_or_else(|| {
        AppError::Validation("No AI agent configured for this business".to_string())
    })?;

    let profile = BusinessProfile {
        business_name: update
            .business_name
            .clone()
            .unwrap_or_else(|| business.name.clone()),
        industry: update.industry.clone().or_else(|| business.industry.clone()),
        services: update.services.clone(),
        pricing: update.pricing.clone(),
        special_instructions: update.special_instructions.clone(),
    };
    let payload = UpdateAgentPayload {
        prompt: Some(build_agent_prompt(&profile)),
        transfer_phone_number: update
            .phone_number
            .clone()
            .or_else(|| business.phone.clone())
            .or_else(|| business.phone_number.clone()),
        active: None,
    };
    state.vendor.update_agent(&agent_id, &payload).await?;
    info!(business_id=%business_id, agent_id=%agent_id, "agent updated at vendor");

    let changed = BusinessProfileUpdate {
        name: update
            .business_name
            .clone()
            .filter(|n| *n != business.name),
        phone: update
            .phone_number
            .clone()
            .filter(|p| Some(p) != business.phone.as_ref()),
        industry: update
            .industry
            .clone()
            .filter(|i| Some(i) != business.industry.as_ref()),
    };
    if !changed.is_empty() {
        store
            .update_business_profile(business_id, &changed)
            .await
            .map_err(|e| {
                log_store_error("failed to update business record", &e);
                AppError::from(e)
            })?;
    }

    let mut warnings = vec![];
    record_activity(
        store,
        business_id,
        "agent_updated",
        "AI agent settings updated".to_string(),
        json!({
            "agent_id": agent_id,
            "changes": {
                "business_name": profile.business_name,
                "phone_number": payload.transfer_phone_number,
                "industry": profile.industry,
            },
        }),
        &mut warnings,
    )
    .await;
    Ok(warnings)
}
