use crate::bland_types::{
    AgentResponse, CreateAgentPayload, LinkNumberPayload, NumberSearchQuery, NumberSearchResponse,
    PurchaseNumberPayload, PurchaseNumberResponse, UpdateAgentPayload,
};
use crate::error::VendorError;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

/// The voice-agent vendor's REST surface, as far as this service uses it.
#[async_trait]
pub trait VoiceAgentApi: Send + Sync {
    async fn create_agent(&self, payload: &CreateAgentPayload) -> Result<String, VendorError>;
    async fn update_agent(
        &self,
        agent_id: &str,
        payload: &UpdateAgentPayload,
    ) -> Result<(), VendorError>;
    async fn set_agent_active(&self, agent_id: &str, active: bool) -> Result<(), VendorError>;
    /// Numbers available for purchase, optionally restricted to an area code.
    async fn search_numbers(&self, area_code: Option<&str>) -> Result<Vec<String>, VendorError>;
    async fn purchase_number(&self, phone_number: &str) -> Result<String, VendorError>;
    async fn link_number(
        &self,
        phone_number: &str,
        payload: &LinkNumberPayload,
    ) -> Result<(), VendorError>;
}

pub struct BlandClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BlandClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, VendorError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(VendorError::from)?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, turning non-2xx responses into `VendorError::Status`.
    async fn send(&self, rq: reqwest::RequestBuilder) -> Result<reqwest::Response, VendorError> {
        let resp = rq
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .send()
            .await
            .map_err(|e| {
                error!(error=%e, "failed to send request to vendor");
                VendorError::from(e)
            })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(status=%status, body=%body, "vendor returned error status");
            return Err(VendorError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        rq: reqwest::RequestBuilder,
    ) -> Result<T, VendorError> {
        let resp = self.send(rq).await?;
        resp.json::<T>().await.map_err(|e| {
            error!(error=%e, "failed to read vendor response");
            VendorError::from(e)
        })
    }
}

#[async_trait]
impl VoiceAgentApi for BlandClient {
    async fn create_agent(&self, payload: &CreateAgentPayload) -> Result<String, VendorError> {
        let rq = self.http_client.post(self.url("/v1/agents")).json(payload);
        let resp: AgentResponse = self.send_json(rq).await?;
        debug!(agent_id=%resp.agent_id, status=?resp.status, "vendor created agent");
        Ok(resp.agent_id)
    }

    async fn update_agent(
        &self,
        agent_id: &str,
        payload: &UpdateAgentPayload,
    ) -> Result<(), VendorError> {
        let rq = self
            .http_client
            .patch(self.url(&format!("/v1/agents/{agent_id}")))
            .json(payload);
        self.send(rq).await?;
        Ok(())
    }

    async fn set_agent_active(&self, agent_id: &str, active: bool) -> Result<(), VendorError> {
        let payload = UpdateAgentPayload {
            active: Some(active),
            ..Default::default()
        };
        self.update_agent(agent_id, &payload).await
    }

    async fn search_numbers(&self, area_code: Option<&str>) -> Result<Vec<String>, VendorError> {
        let query = NumberSearchQuery {
            area_code: area_code.map(str::to_string),
        };
        let rq = self
            .http_client
            .get(self.url("/v1/inbound/search"))
            .query(&query);
        let resp: NumberSearchResponse = self.send_json(rq).await?;
        Ok(resp.numbers.into_iter().map(|n| n.phone_number).collect())
    }

    async fn purchase_number(&self, phone_number: &str) -> Result<String, VendorError> {
        let payload = PurchaseNumberPayload {
            phone_number: phone_number.to_string(),
        };
        let rq = self
            .http_client
            .post(self.url("/v1/inbound/purchase"))
            .json(&payload);
        let resp: PurchaseNumberResponse = self.send_json(rq).await?;
        Ok(resp.phone_number)
    }

    async fn link_number(
        &self,
        phone_number: &str,
        payload: &LinkNumberPayload,
    ) -> Result<(), VendorError> {
        let rq = self
            .http_client
            .post(self.url(&format!("/v1/inbound/{phone_number}")))
            .json(payload);
        self.send(rq).await?;
        Ok(())
    }
}
