//! Read-side meeting queries.
//!
//! Reads go straight to the store; no conflict semantics apply.

use crate::model::meeting::{Meeting, MeetingId, MeetingValidationError};
use crate::model::time_range::{TimeRange, Timestamp};
use crate::repo::store::MeetingStore;
use crate::service::scheduling_service::ServiceError;
use log::debug;

/// Query facade over any meeting store.
pub struct MeetingQueryService<S: MeetingStore> {
    store: S,
}

impl<S: MeetingStore> MeetingQueryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads one meeting by id, failing with `NotFound` when absent.
    pub fn get_by_id(&self, id: MeetingId) -> Result<Meeting, ServiceError> {
        self.store.read(|repo| Ok::<_, ServiceError>(repo.get_meeting(id)?))
    }

    /// Lists every meeting that includes `email`. An empty list is not an error.
    pub fn get_by_participant(&self, email: &str) -> Result<Vec<Meeting>, ServiceError> {
        if email.trim().is_empty() {
            return Err(MeetingValidationError::BlankQueryEmail.into());
        }
        let meetings = self
            .store
            .read(|repo| Ok::<_, ServiceError>(repo.list_by_participant(email)?))?;
        debug!(
            "event=meeting_query module=service status=ok query=participant hits={}",
            meetings.len()
        );
        Ok(meetings)
    }

    /// Lists meetings lying strictly inside `(start, end)`.
    ///
    /// # Errors
    /// - `Validation` when `start >= end`.
    pub fn get_by_window(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Meeting>, ServiceError> {
        let window = TimeRange::new(start, end)?;
        let meetings = self
            .store
            .read(|repo| Ok::<_, ServiceError>(repo.list_within_window(&window)?))?;
        debug!(
            "event=meeting_query module=service status=ok query=window hits={}",
            meetings.len()
        );
        Ok(meetings)
    }
}
