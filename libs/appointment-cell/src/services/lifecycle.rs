// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};

use crate::models::{BookingConfirmation, BookingError, BookingForm, BookingRequest, BookingStatus};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Pure transitions of a `BookingRequest`. Nothing here touches the network.
#[derive(Debug, Clone, Copy)]
pub struct BookingLifecycleService {
    reason_max_chars: usize,
}

impl BookingLifecycleService {
    pub fn new(reason_max_chars: usize) -> Self {
        Self { reason_max_chars }
    }

    pub fn validate_status_transition(
        &self,
        current: BookingStatus,
        next: BookingStatus,
    ) -> Result<(), BookingError> {
        if !current.can_transition_to(next) {
            warn!("Invalid booking transition attempted: {} -> {}", current, next);
            return Err(BookingError::InvalidTransition { from: current, to: next });
        }
        Ok(())
    }

    /// Apply a form edit. Editing a failed request returns it to `Draft`.
    pub fn edit(&self, request: &mut BookingRequest, form: BookingForm) -> Result<(), BookingError> {
        match request.status {
            BookingStatus::Draft => {}
            BookingStatus::Failed => self.validate_status_transition(request.status, BookingStatus::Draft)?,
            other => {
                return Err(BookingError::InvalidTransition { from: other, to: BookingStatus::Draft });
            }
        }

        if let Some(reason) = &form.reason_text {
            self.check_reason(reason)?;
        }

        if let Some(date) = form.requested_date {
            request.requested_date = date;
        }
        if let Some(time) = form.requested_time {
            request.requested_time = time;
        }
        if let Some(reason) = form.reason_text {
            request.reason_text = reason;
        }

        request.status = BookingStatus::Draft;
        request.updated_at = Utc::now();
        debug!("Booking {} form updated", request.id);
        Ok(())
    }

    /// Validate the form and enter `Submitting`. A failed request is resubmitted
    /// by way of `Draft`. On rejection the request is left exactly as it was.
    pub fn begin_submit(&self, request: &mut BookingRequest) -> Result<(), BookingError> {
        let from = match request.status {
            BookingStatus::Failed => {
                self.validate_status_transition(BookingStatus::Failed, BookingStatus::Draft)?;
                BookingStatus::Draft
            }
            other => other,
        };
        self.validate_status_transition(from, BookingStatus::Submitting)?;
        self.validate_form(request)?;

        request.status = BookingStatus::Submitting;
        request.last_error = None;
        request.updated_at = Utc::now();
        info!("Booking {} submitting for facility {}", request.id, request.facility_id);
        Ok(())
    }

    /// Record the gateway outcome. Entered values are kept on failure.
    pub fn complete(
        &self,
        request: &mut BookingRequest,
        outcome: Result<String, BookingError>,
    ) -> Result<(), BookingError> {
        match outcome {
            Ok(appointment_id) => {
                self.validate_status_transition(request.status, BookingStatus::Confirmed)?;
                info!("Booking {} confirmed as appointment {}", request.id, appointment_id);
                request.status = BookingStatus::Confirmed;
                request.confirmation = Some(BookingConfirmation::new(appointment_id));
            }
            Err(err) => {
                self.validate_status_transition(request.status, BookingStatus::Failed)?;
                warn!("Booking {} failed: {}", request.id, err);
                request.status = BookingStatus::Failed;
                request.last_error = Some(err.to_string());
            }
        }
        request.updated_at = Utc::now();
        Ok(())
    }

    pub fn ensure_closable(&self, request: &BookingRequest) -> Result<(), BookingError> {
        if request.status == BookingStatus::Submitting {
            return Err(BookingError::StillSubmitting);
        }
        Ok(())
    }

    pub fn validate_form(&self, request: &BookingRequest) -> Result<(), BookingError> {
        let date = request.requested_date.trim();
        if date.is_empty() {
            return Err(BookingError::Validation("Please choose a date".to_string()));
        }
        NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| BookingError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", date)))?;

        let time = request.requested_time.trim();
        if time.is_empty() {
            return Err(BookingError::Validation("Please choose a time".to_string()));
        }
        NaiveTime::parse_from_str(time, TIME_FORMAT)
            .map_err(|_| BookingError::Validation(format!("Invalid time '{}', expected HH:MM", time)))?;

        self.check_reason(&request.reason_text)
    }

    fn check_reason(&self, reason: &str) -> Result<(), BookingError> {
        let length = reason.chars().count();
        if length > self.reason_max_chars {
            return Err(BookingError::Validation(format!(
                "Reason must be at most {} characters (got {})",
                self.reason_max_chars, length
            )));
        }
        Ok(())
    }
}
