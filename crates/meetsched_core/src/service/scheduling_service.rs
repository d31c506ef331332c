//! Meeting scheduling use-case service.
//!
//! # Responsibility
//! - Validate candidate meetings.
//! - Detect double-booking per participant before committing.
//! - Commit admitted meetings through the store.
//!
//! # Invariants
//! - Two persisted meetings sharing a participant email never overlap.
//! - A rejected proposal leaves the store unchanged.
//! - A storage failure during conflict detection aborts the proposal; it is
//!   never read as "no conflict".

use crate::model::meeting::{Meeting, MeetingDraft, MeetingId, MeetingValidationError};
use crate::model::time_range::TimeRange;
use crate::repo::meeting_repo::{MeetingRepository, RepoError};
use crate::repo::store::MeetingStore;
use chrono::Utc;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Caller-facing classification of service failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input. Never worth retrying unchanged.
    Validation,
    /// Double-booking. The caller must pick another interval.
    Conflict,
    /// Single-meeting lookup found nothing.
    NotFound,
    /// Connectivity, timeout or backend failure. May be retried.
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Storage => "storage",
        }
    }
}

/// What a rejected proposal collided with.
///
/// Both fields are `None` when the write-time constraint caught an overlap
/// that the conflict query did not report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictDetails {
    pub email: Option<String>,
    pub existing: Option<MeetingId>,
}

/// Service error for scheduling and query use-cases.
#[derive(Debug)]
pub enum ServiceError {
    Validation(MeetingValidationError),
    Conflict(ConflictDetails),
    NotFound(MeetingId),
    Storage(RepoError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Returns whether this is a storage failure caused by an expired wait.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_timeout())
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid meeting request: {err}"),
            Self::Conflict(details) => match (&details.email, details.existing) {
                (Some(email), Some(existing)) => write!(
                    f,
                    "participant `{email}` is already booked in meeting {existing}"
                ),
                (Some(email), None) => write!(f, "participant `{email}` is already booked"),
                _ => write!(f, "meeting clashes with an existing booking"),
            },
            Self::NotFound(id) => write!(f, "meeting not found: {id}"),
            Self::Storage(err) if err.is_timeout() => write!(f, "storage timed out: {err}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Conflict(_) | Self::NotFound(_) => None,
        }
    }
}

impl From<MeetingValidationError> for ServiceError {
    fn from(value: MeetingValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Overlap(_) => Self::Conflict(ConflictDetails {
                email: None,
                existing: None,
            }),
            other => Self::Storage(other),
        }
    }
}

/// Scheduling engine over any meeting store.
pub struct SchedulingService<S: MeetingStore> {
    store: S,
}

impl<S: MeetingStore> SchedulingService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Admits a candidate meeting or explains why it cannot be admitted.
    ///
    /// # Contract
    /// - Assigns a fresh id and creation timestamp on success.
    /// - Performs exactly one insert on success and none on rejection.
    /// - Conflict queries and the insert run in one exclusive write scope.
    ///
    /// # Errors
    /// - `Validation` for an empty participant list, a blank participant
    ///   email or `start_time >= end_time`.
    /// - `Conflict` when any participant already has an overlapping meeting.
    /// - `Storage` when the store fails or times out.
    pub fn propose_meeting(&self, draft: &MeetingDraft) -> Result<Meeting, ServiceError> {
        let started_at = Instant::now();
        let result = self.admit(draft);
        let duration_ms = started_at.elapsed().as_millis();

        match &result {
            Ok(meeting) => info!(
                "event=meeting_propose module=service status=ok meeting_id={} participants={} duration_ms={duration_ms}",
                meeting.id,
                meeting.participants.len()
            ),
            Err(ServiceError::Storage(err)) => error!(
                "event=meeting_propose module=service status=error error_code=storage timeout={} duration_ms={duration_ms} error={err}",
                err.is_timeout()
            ),
            Err(err) => info!(
                "event=meeting_propose module=service status=rejected reason={} duration_ms={duration_ms}",
                err.kind().as_str()
            ),
        }

        result
    }

    fn admit(&self, draft: &MeetingDraft) -> Result<Meeting, ServiceError> {
        draft.validate()?;
        let range = draft.time_range()?;
        let meeting = Meeting::from_draft(draft.clone(), Uuid::new_v4(), Utc::now());

        self.store.write(|repo| {
            if let Some(conflict) = first_conflict(repo, &meeting, &range)? {
                return Err(ServiceError::Conflict(conflict));
            }
            repo.insert_meeting(&meeting)?;
            Ok(())
        })?;

        Ok(meeting)
    }
}

/// Runs one overlap query per distinct participant email.
fn first_conflict(
    repo: &dyn MeetingRepository,
    meeting: &Meeting,
    range: &TimeRange,
) -> Result<Option<ConflictDetails>, RepoError> {
    for email in meeting.distinct_emails() {
        if let Some(existing) = repo.find_conflicts(email, range)?.first() {
            return Ok(Some(ConflictDetails {
                email: Some(email.to_string()),
                existing: Some(existing.id),
            }));
        }
    }
    Ok(None)
}
