#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use receptionist_rs::bland_types::{CreateAgentPayload, LinkNumberPayload, UpdateAgentPayload};
use receptionist_rs::config::Config;
use receptionist_rs::db_types::NewBusiness;
use receptionist_rs::error::VendorError;
use receptionist_rs::memory_store::MemoryStore;
use receptionist_rs::store::Store;
use receptionist_rs::types::AppState;
use receptionist_rs::vendor::VoiceAgentApi;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Every request the fake vendor saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum VendorCall {
    CreateAgent(CreateAgentPayload),
    UpdateAgent(String, UpdateAgentPayload),
    SetActive(String, bool),
    Search(Option<String>),
    Purchase(String),
    Link(String, String),
}

/// Scripted stand-in for the vendor API.
#[derive(Default)]
pub struct FakeVendor {
    pub calls: Mutex<Vec<VendorCall>>,
    pub available_numbers: Mutex<Vec<String>>,
    pub fail_create: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_set_active: AtomicBool,
    pub fail_purchase: AtomicBool,
    pub fail_link: AtomicBool,
}

fn outage() -> VendorError {
    VendorError::Status {
        status: 503,
        body: "vendor unavailable".to_string(),
    }
}

impl FakeVendor {
    pub fn with_numbers(numbers: &[&str]) -> Self {
        let vendor = Self::default();
        *vendor.available_numbers.lock().unwrap() =
            numbers.iter().map(|n| n.to_string()).collect();
        vendor
    }

    pub fn calls(&self) -> Vec<VendorCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&VendorCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: VendorCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn fails(flag: &AtomicBool) -> Result<(), VendorError> {
        if flag.load(Ordering::SeqCst) {
            Err(outage())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl VoiceAgentApi for FakeVendor {
    async fn create_agent(&self, payload: &CreateAgentPayload) -> Result<String, VendorError> {
        self.record(VendorCall::CreateAgent(payload.clone()));
        Self::fails(&self.fail_create)?;
        Ok(format!("agent-{}", payload.metadata.business_id))
    }

    async fn update_agent(
        &self,
        agent_id: &str,
        payload: &UpdateAgentPayload,
    ) -> Result<(), VendorError> {
        self.record(VendorCall::UpdateAgent(agent_id.to_string(), payload.clone()));
        Self::fails(&self.fail_update)
    }

    async fn set_agent_active(&self, agent_id: &str, active: bool) -> Result<(), VendorError> {
        self.record(VendorCall::SetActive(agent_id.to_string(), active));
        Self::fails(&self.fail_set_active)
    }

    async fn search_numbers(&self, area_code: Option<&str>) -> Result<Vec<String>, VendorError> {
        self.record(VendorCall::Search(area_code.map(str::to_string)));
        Ok(self.available_numbers.lock().unwrap().clone())
    }

    async fn purchase_number(&self, phone_number: &str) -> Result<String, VendorError> {
        self.record(VendorCall::Purchase(phone_number.to_string()));
        Self::fails(&self.fail_purchase)?;
        self.available_numbers
            .lock()
            .unwrap()
            .retain(|n| n != phone_number);
        Ok(phone_number.to_string())
    }

    async fn link_number(
        &self,
        phone_number: &str,
        payload: &LinkNumberPayload,
    ) -> Result<(), VendorError> {
        self.record(VendorCall::Link(
            phone_number.to_string(),
            payload.agent_id.clone(),
        ));
        Self::fails(&self.fail_link)
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|name| match name {
        "BLAND_API_KEY" => Some("sk-test".to_string()),
        "PUBLIC_BASE_URL" => Some("https://septic.example.com".to_string()),
        _ => None,
    })
    .unwrap()
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub vendor: Arc<FakeVendor>,
    pub state: Arc<AppState>,
    pub router: Router,
}

impl TestApp {
    pub async fn new(vendor: FakeVendor) -> Self {
        let store = Arc::new(MemoryStore::new());
        store
            .create_business(&NewBusiness {
                id: "B1".to_string(),
                name: "Acme Septic".to_string(),
                phone: Some("+15558675309".to_string()),
                industry: Some("Septic Services".to_string()),
            })
            .await
            .unwrap();
        let vendor = Arc::new(vendor);
        let state = Arc::new(AppState::new(
            test_config(),
            store.clone(),
            vendor.clone(),
        ));
        let router = receptionist_rs::app(state.clone());
        Self {
            store,
            vendor,
            state,
            router,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        let rq = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = self.router.clone().oneshot(rq).await.unwrap();
        let status = resp.status();
        let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, &body.to_string()).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, "").await
    }
}
