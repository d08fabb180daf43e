use crate::db_types::{
    ActivityEntry, Appointment, Business, BusinessProfileUpdate, Call, CallInsert, NewActivity,
    NewAppointment, NewBusiness, NewCall,
};
use crate::error::StoreError;
use crate::store::Store;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    businesses: HashMap<String, Business>,
    calls: Vec<Call>,
    appointments: Vec<Appointment>,
    activity: Vec<ActivityEntry>,
}

/// Which writes should fail, for exercising partial-failure paths.
#[derive(Default)]
pub struct Faults {
    pub calls: AtomicBool,
    pub appointments: AtomicBool,
    pub activity: AtomicBool,
    pub business_updates: AtomicBool,
}

/// In-process store for local development and tests.  Enforces the same constraints as the
/// Postgres schema: calls and appointments need an existing business, vendor call ids are unique.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    pub faults: Faults,
}

fn check(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
    if flag.load(Ordering::SeqCst) {
        Err(StoreError::Unavailable(format!("injected {what} failure")))
    } else {
        Ok(())
    }
}

fn missing_business(id: &str) -> StoreError {
    StoreError::Unavailable(format!("business {id} does not exist"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn update_business(
        &self,
        id: &str,
        f: impl FnOnce(&mut Business),
    ) -> Result<(), StoreError> {
        check(&self.faults.business_updates, "business update")?;
        let mut tables = self.tables()?;
        let business = tables
            .businesses
            .get_mut(id)
            .ok_or_else(|| missing_business(id))?;
        f(business);
        business.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_business(&self, id: &str) -> Result<Option<Business>, StoreError> {
        Ok(self.tables()?.businesses.get(id).cloned())
    }

    async fn create_business(&self, business: &NewBusiness) -> Result<Business, StoreError> {
        let mut tables = self.tables()?;
        if tables.businesses.contains_key(&business.id) {
            return Err(StoreError::Unavailable(format!(
                "business {} already exists",
                business.id
            )));
        }
        let now = OffsetDateTime::now_utc();
        let row = Business {
            id: business.id.clone(),
            name: business.name.clone(),
            phone: business.phone.clone(),
            industry: business.industry.clone(),
            agent_id: None,
            phone_number: None,
            phone_number_linked: false,
            ai_enabled: false,
            created_at: now,
            updated_at: now,
        };
        tables.businesses.insert(row.id.clone(), row.clone());
        Ok(row)
    }

    async fn update_business_profile(
        &self,
        id: &str,
        update: &BusinessProfileUpdate,
    ) -> Result<(), StoreError> {
        self.update_business(id, |b| {
            if let Some(name) = &update.name {
                b.name = name.clone();
            }
            if let Some(phone) = &update.phone {
                b.phone = Some(phone.clone());
            }
            if let Some(industry) = &update.industry {
                b.industry = Some(industry.clone());
            }
        })
    }

    async fn bind_agent(&self, id: &str, agent_id: &str) -> Result<(), StoreError> {
        self.update_business(id, |b| {
            b.agent_id = Some(agent_id.to_string());
            b.ai_enabled = true;
        })
    }

    async fn set_phone_number(
        &self,
        id: &str,
        phone_number: &str,
        linked: bool,
    ) -> Result<(), StoreError> {
        self.update_business(id, |b| {
            b.phone_number = Some(phone_number.to_string());
            b.phone_number_linked = linked;
        })
    }

    async fn set_ai_enabled(&self, id: &str, enabled: bool) -> Result<(), StoreError> {
        self.update_business(id, |b| b.ai_enabled = enabled)
    }

    async fn insert_call(&self, call: &NewCall) -> Result<CallInsert, StoreError> {
        check(&self.faults.calls, "call insert")?;
        let mut tables = self.tables()?;
        if !tables.businesses.contains_key(&call.business_id) {
            return Err(missing_business(&call.business_id));
        }
        if let Some(vendor_id) = &call.vendor_call_id {
            let existing = tables
                .calls
                .iter()
                .find(|c| c.vendor_call_id.as_ref() == Some(vendor_id));
            if let Some(existing) = existing {
                return Ok(CallInsert::Duplicate(existing.clone()));
            }
        }
        let row = Call {
            id: Uuid::new_v4(),
            business_id: call.business_id.clone(),
            vendor_call_id: call.vendor_call_id.clone(),
            caller_phone: call.caller_phone.clone(),
            caller_name: call.caller_name.clone(),
            start_time: call.start_time,
            end_time: call.end_time,
            duration_seconds: call.duration_seconds,
            recording_url: call.recording_url.clone(),
            transcript: call.transcript.clone(),
            variables: call.variables.clone(),
            outcome: call.outcome.clone(),
            service_requested: call.service_requested.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        tables.calls.push(row.clone());
        Ok(CallInsert::Created(row))
    }

    async fn insert_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, StoreError> {
        check(&self.faults.appointments, "appointment insert")?;
        let mut tables = self.tables()?;
        if !tables.businesses.contains_key(&appointment.business_id) {
            return Err(missing_business(&appointment.business_id));
        }
        let row = Appointment {
            id: Uuid::new_v4(),
            call_id: appointment.call_id,
            business_id: appointment.business_id.clone(),
            customer_name: appointment.customer_name.clone(),
            customer_phone: appointment.customer_phone.clone(),
            service_type: appointment.service_type.clone(),
            scheduled_date: appointment.scheduled_date,
            scheduled_time: appointment.scheduled_time.clone(),
            property_address: appointment.property_address.clone(),
            problem_description: appointment.problem_description.clone(),
            status: appointment.status.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        tables.appointments.push(row.clone());
        Ok(row)
    }

    async fn append_activity(&self, entry: &NewActivity) -> Result<(), StoreError> {
        check(&self.faults.activity, "activity log")?;
        let mut tables = self.tables()?;
        if !tables.businesses.contains_key(&entry.business_id) {
            return Err(missing_business(&entry.business_id));
        }
        tables.activity.push(ActivityEntry {
            id: Uuid::new_v4(),
            business_id: entry.business_id.clone(),
            activity_type: entry.activity_type.clone(),
            description: entry.description.clone(),
            metadata: entry.metadata.clone(),
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(())
    }

    async fn list_calls(&self, business_id: &str) -> Result<Vec<Call>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .calls
            .iter()
            .rev()
            .filter(|c| c.business_id == business_id)
            .cloned()
            .collect())
    }

    async fn list_appointments(&self, business_id: &str) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .appointments
            .iter()
            .rev()
            .filter(|a| a.business_id == business_id)
            .cloned()
            .collect())
    }

    async fn list_activity(&self, business_id: &str) -> Result<Vec<ActivityEntry>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .activity
            .iter()
            .rev()
            .filter(|a| a.business_id == business_id)
            .cloned()
            .collect())
    }
}
