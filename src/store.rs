use crate::db_types::{
    ActivityEntry, Appointment, Business, BusinessProfileUpdate, Call, CallInsert, NewActivity,
    NewAppointment, NewBusiness, NewCall,
};
use crate::error::StoreError;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

/// Persistence seam for businesses, calls, appointments, and the activity log.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_business(&self, id: &str) -> Result<Option<Business>, StoreError>;
    async fn create_business(&self, business: &NewBusiness) -> Result<Business, StoreError>;
    async fn update_business_profile(
        &self,
        id: &str,
        update: &BusinessProfileUpdate,
    ) -> Result<(), StoreError>;
    /// Record the vendor agent id and switch the AI on.
    async fn bind_agent(&self, id: &str, agent_id: &str) -> Result<(), StoreError>;
    async fn set_phone_number(
        &self,
        id: &str,
        phone_number: &str,
        linked: bool,
    ) -> Result<(), StoreError>;
    async fn set_ai_enabled(&self, id: &str, enabled: bool) -> Result<(), StoreError>;

    /// Insert a call.  A vendor call id already on file is not inserted twice.
    async fn insert_call(&self, call: &NewCall) -> Result<CallInsert, StoreError>;
    async fn insert_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, StoreError>;
    async fn append_activity(&self, entry: &NewActivity) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_calls(&self, business_id: &str) -> Result<Vec<Call>, StoreError>;
    /// Newest first.
    async fn list_appointments(&self, business_id: &str) -> Result<Vec<Appointment>, StoreError>;
    /// Newest first.
    async fn list_activity(&self, business_id: &str) -> Result<Vec<ActivityEntry>, StoreError>;
}

pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

/// Business updates that touch no row mean the business vanished underneath us.
fn expect_one_row(rows_affected: u64) -> Result<(), StoreError> {
    if rows_affected == 0 {
        Err(StoreError::Database(sqlx::Error::RowNotFound))
    } else {
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_business(&self, id: &str) -> Result<Option<Business>, StoreError> {
        let business = sqlx::query_as::<_, Business>(
            "
            select *
            from businesses
            where id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(business)
    }

    async fn create_business(&self, business: &NewBusiness) -> Result<Business, StoreError> {
        let row = sqlx::query_as::<_, Business>(
            "
            insert into businesses (
              id,
              name,
              phone,
              industry
            ) values (
              $1,
              $2,
              $3,
              $4
            )
            returning *
            ",
        )
        .bind(&business.id)
        .bind(&business.name)
        .bind(&business.phone)
        .bind(&business.industry)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_business_profile(
        &self,
        id: &str,
        update: &BusinessProfileUpdate,
    ) -> Result<(), StoreError> {
        let res = sqlx::query(
            "
            update businesses
            set name = coalesce($2, name),
                phone = coalesce($3, phone),
                industry = coalesce($4, industry),
                updated_at = now()
            where id = $1
            ",
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.phone)
        .bind(&update.industry)
        .execute(&self.pool)
        .await?;
        expect_one_row(res.rows_affected())
    }

    async fn bind_agent(&self, id: &str, agent_id: &str) -> Result<(), StoreError> {
        let res = sqlx::query(
            "
            update businesses
            set agent_id = $2,
                ai_enabled = true,
                updated_at = now()
            where id = $1
            ",
        )
        .bind(id)
        .bind(agent_id)
        .execute(&self.pool)
        .await?;
        expect_one_row(res.rows_affected())
    }

    async fn set_phone_number(
        &self,
        id: &str,
        phone_number: &str,
        linked: bool,
    ) -> Result<(), StoreError> {
        let res = sqlx::query(
            "
            update businesses
            set phone_number = $2,
                phone_number_linked = $3,
                updated_at = now()
            where id = $1
            ",
        )
        .bind(id)
        .bind(phone_number)
        .bind(linked)
        .execute(&self.pool)
        .await?;
        expect_one_row(res.rows_affected())
    }

    async fn set_ai_enabled(&self, id: &str, enabled: bool) -> Result<(), StoreError> {
        let res = sqlx::query(
            "
            update businesses
            set ai_enabled = $2,
                updated_at = now()
            where id = $1
            ",
        )
        .bind(id)
        .bind(enabled)
        .execute(&self.pool)
        .await?;
        expect_one_row(res.rows_affected())
    }

    async fn insert_call(&self, call: &NewCall) -> Result<CallInsert, StoreError> {
        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query_as::<_, Call>(
            "
            insert into calls (
              id,
              business_id,
              vendor_call_id,
              caller_phone,
              caller_name,
              start_time,
              end_time,
              duration_seconds,
              recording_url,
              transcript,
              variables,
              outcome,
              service_requested
            ) values (
              $1,
              $2,
              $3,
              $4,
              $5,
              $6,
              $7,
              $8,
              $9,
              $10,
              $11,
              $12,
              $13
            )
            on conflict (vendor_call_id) where vendor_call_id is not null do nothing
            returning *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(&call.business_id)
        .bind(&call.vendor_call_id)
        .bind(&call.caller_phone)
        .bind(&call.caller_name)
        .bind(call.start_time)
        .bind(call.end_time)
        .bind(call.duration_seconds)
        .bind(&call.recording_url)
        .bind(&call.transcript)
        .bind(&call.variables)
        .bind(&call.outcome)
        .bind(&call.service_requested)
        .fetch_optional(&mut *tx)
        .await?;

        let res = match inserted {
            Some(row) => CallInsert::Created(row),
            None => {
                let existing = sqlx::query_as::<_, Call>(
                    "
                    select *
                    from calls
                    where vendor_call_id = $1
                    ",
                )
                .bind(&call.vendor_call_id)
                .fetch_one(&mut *tx)
                .await?;
                CallInsert::Duplicate(existing)
            }
        };
        tx.commit().await?;
        Ok(res)
    }

    async fn insert_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, StoreError> {
        let row = sqlx::query_as::<_, Appointment>(
            "
            insert into appointments (
              id,
              call_id,
              business_id,
              customer_name,
              customer_phone,
              service_type,
              scheduled_date,
              scheduled_time,
              property_address,
              problem_description,
              status
            ) values (
              $1,
              $2,
              $3,
              $4,
              $5,
              $6,
              $7,
              $8,
              $9,
              $10,
              $11
            )
            returning *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(appointment.call_id)
        .bind(&appointment.business_id)
        .bind(&appointment.customer_name)
        .bind(&appointment.customer_phone)
        .bind(&appointment.service_type)
        .bind(appointment.scheduled_date)
        .bind(&appointment.scheduled_time)
        .bind(&appointment.property_address)
        .bind(&appointment.problem_description)
        .bind(&appointment.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn append_activity(&self, entry: &NewActivity) -> Result<(), StoreError> {
        sqlx::query(
            "
            insert into business_activity_log (
              id,
              business_id,
              activity_type,
              description,
              metadata
            ) values (
              $1,
              $2,
              $3,
              $4,
              $5
            )
            ",
        )
        .bind(Uuid::new_v4())
        .bind(&entry.business_id)
        .bind(&entry.activity_type)
        .bind(&entry.description)
        .bind(&entry.metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_calls(&self, business_id: &str) -> Result<Vec<Call>, StoreError> {
        let rows = sqlx::query_as::<_, Call>(
            "
            select *
            from calls
            where business_id = $1
            order by created_at desc
            ",
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_appointments(&self, business_id: &str) -> Result<Vec<Appointment>, StoreError> {
        let rows = sqlx::query_as::<_, Appointment>(
            "
            select *
            from appointments
            where business_id = $1
            order by created_at desc
            ",
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_activity(&self, business_id: &str) -> Result<Vec<ActivityEntry>, StoreError> {
        let rows = sqlx::query_as::<_, ActivityEntry>(
            "
            select *
            from business_activity_log
            where business_id = $1
            order by created_at desc
            ",
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
