// libs/appointment-cell/src/services/booking.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use clinic_discovery_cell::models::FacilityRecord;

use crate::models::{BookingError, BookingForm, BookingRequest, BookingStatus, FacilitySelection};
use crate::services::lifecycle::BookingLifecycleService;
use crate::services::selection::select_facility;

/// Persists a submitted booking and returns the new appointment id.
#[async_trait]
pub trait AppointmentGateway: Send + Sync {
    async fn create_appointment(
        &self,
        request: &BookingRequest,
        auth_token: Option<&str>,
    ) -> Result<String, BookingError>;
}

pub struct SupabaseAppointmentGateway {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl AppointmentGateway for SupabaseAppointmentGateway {
    async fn create_appointment(
        &self,
        request: &BookingRequest,
        auth_token: Option<&str>,
    ) -> Result<String, BookingError> {
        let appointment_data = json!({
            "clinic_id": request.facility_id,
            "clinic_name": request.facility_name,
            "specialty": request.specialty,
            "appointment_date": request.requested_date.trim(),
            "appointment_time": request.requested_time.trim(),
            "reason": request.reason_text,
            "status": "pending"
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        debug!("Creating appointment for clinic {}", request.facility_id);

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                auth_token,
                Some(appointment_data),
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::Gateway(e.to_string()))?;

        let id = result
            .first()
            .and_then(|row| row.get("id"))
            .map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| BookingError::Gateway("Failed to create appointment".to_string()))?;

        Ok(id)
    }
}

/// Open booking drafts, keyed by booking id. A confirmed booking is dropped
/// as soon as its confirmation is handed back, and drafts left untouched for
/// longer than `idle_ttl` are dropped when another one opens.
#[derive(Clone)]
pub struct BookingStore {
    bookings: Arc<RwLock<HashMap<Uuid, BookingRequest>>>,
    idle_ttl: Duration,
}

impl BookingStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            bookings: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl,
        }
    }

    pub async fn insert(&self, request: BookingRequest) {
        let mut bookings = self.bookings.write().await;

        let now = Utc::now();
        let before = bookings.len();
        bookings.retain(|_, b| {
            b.status == BookingStatus::Submitting
                || (now - b.updated_at).to_std().map_or(true, |idle| idle < self.idle_ttl)
        });
        if bookings.len() < before {
            info!("Evicted {} idle booking drafts", before - bookings.len());
        }

        bookings.insert(request.id, request);
    }

    pub async fn get(&self, id: Uuid) -> Option<BookingRequest> {
        self.bookings.read().await.get(&id).cloned()
    }

    pub async fn is_empty(&self) -> bool {
        self.bookings.read().await.is_empty()
    }

    /// Record a gateway outcome on a submitting request.
    async fn finish(
        &self,
        id: Uuid,
        lifecycle: &BookingLifecycleService,
        outcome: Result<String, BookingError>,
    ) -> Result<BookingRequest, BookingError> {
        let mut bookings = self.bookings.write().await;
        // Closing is refused while submitting, so the draft is still here
        let request = bookings.get_mut(&id).ok_or(BookingError::NotFound)?;
        lifecycle.complete(request, outcome)?;
        let finished = request.clone();

        if finished.status == BookingStatus::Confirmed {
            bookings.remove(&id);
            debug!("Booking {} confirmed and released", id);
        }
        Ok(finished)
    }
}

pub struct BookingService {
    gateway: Arc<dyn AppointmentGateway>,
    store: BookingStore,
    lifecycle: BookingLifecycleService,
    timeout: Duration,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_gateway(config, Arc::new(SupabaseAppointmentGateway::new(config)))
    }

    pub fn with_gateway(config: &AppConfig, gateway: Arc<dyn AppointmentGateway>) -> Self {
        Self {
            gateway,
            store: BookingStore::new(Duration::from_secs(config.idle_ttl_secs)),
            lifecycle: BookingLifecycleService::new(config.booking_reason_max_chars),
            timeout: Duration::from_secs(config.booking_timeout_secs),
        }
    }

    pub fn store(&self) -> &BookingStore {
        &self.store
    }

    /// Select a facility from the results. A draft is stored only for
    /// bookable facilities.
    pub async fn open(&self, record: &FacilityRecord) -> FacilitySelection {
        let selection = select_facility(record);
        if let FacilitySelection::Book { booking } = &selection {
            self.store.insert(booking.clone()).await;
            info!("Booking {} opened for {}", booking.id, booking.facility_name);
        }
        selection
    }

    pub async fn get(&self, id: Uuid) -> Result<BookingRequest, BookingError> {
        self.store.get(id).await.ok_or(BookingError::NotFound)
    }

    pub async fn update(&self, id: Uuid, form: BookingForm) -> Result<BookingRequest, BookingError> {
        let mut bookings = self.store.bookings.write().await;
        let request = bookings.get_mut(&id).ok_or(BookingError::NotFound)?;
        self.lifecycle.edit(request, form)?;
        Ok(request.clone())
    }

    /// Validate, call the gateway once, and record the outcome. Gateway
    /// failures and timeouts end in `Failed` rather than an error.
    ///
    /// The gateway call runs on its own task, so the outcome is recorded even
    /// when the caller stops waiting for it.
    pub async fn submit(&self, id: Uuid, auth_token: Option<&str>) -> Result<BookingRequest, BookingError> {
        let snapshot = {
            let mut bookings = self.store.bookings.write().await;
            let request = bookings.get_mut(&id).ok_or(BookingError::NotFound)?;
            self.lifecycle.begin_submit(request)?;
            request.clone()
        };

        let gateway = self.gateway.clone();
        let store = self.store.clone();
        let lifecycle = self.lifecycle;
        let timeout = self.timeout;
        let auth_token = auth_token.map(str::to_string);

        let task = tokio::spawn(async move {
            let outcome = match tokio::time::timeout(
                timeout,
                gateway.create_appointment(&snapshot, auth_token.as_deref()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(BookingError::Timeout(timeout.as_secs())),
            };
            store.finish(id, &lifecycle, outcome).await
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!("Booking {} submission task failed: {}", id, e);
                let interrupted = Err(BookingError::Gateway("Booking submission was interrupted".to_string()));
                self.store.finish(id, &self.lifecycle, interrupted).await
            }
        }
    }

    /// Discard a draft. Refused while a submission is in flight.
    pub async fn close(&self, id: Uuid) -> Result<(), BookingError> {
        let mut bookings = self.store.bookings.write().await;
        let request = bookings.get(&id).ok_or(BookingError::NotFound)?;
        self.lifecycle.ensure_closable(request)?;
        bookings.remove(&id);
        info!("Booking {} closed", id);
        Ok(())
    }
}
