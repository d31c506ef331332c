//! Meeting record, participants and candidate validation.
//!
//! # Responsibility
//! - Define the persisted `Meeting` shape and the `MeetingDraft` candidate.
//! - Validate interval sanity and participant presence before any store call.
//!
//! # Invariants
//! - `id` and `created_at` are assigned once by the scheduling service.
//! - `start_time < end_time` for every valid meeting.
//! - Participant order is kept for display only.

use crate::model::time_range::{TimeRange, Timestamp};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one meeting.
pub type MeetingId = Uuid;

/// Validation failures for meeting candidates and persisted records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingValidationError {
    NilId,
    EmptyParticipants,
    BlankParticipantEmail { index: usize },
    /// A participant lookup was asked for an empty key.
    BlankQueryEmail,
    InvalidInterval { start: Timestamp, end: Timestamp },
    UnparseableInstant(String),
    /// Instants are kept and compared at microsecond resolution.
    SubMicrosecondInstant(Timestamp),
    MalformedId(String),
}

impl Display for MeetingValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "meeting id must not be nil"),
            Self::EmptyParticipants => write!(f, "meeting must have at least one participant"),
            Self::BlankParticipantEmail { index } => {
                write!(f, "participant #{index} has a blank email")
            }
            Self::BlankQueryEmail => write!(f, "participant email to look up must not be blank"),
            Self::InvalidInterval { start, end } => write!(
                f,
                "meeting start `{}` must be before end `{}`",
                start.to_rfc3339(),
                end.to_rfc3339()
            ),
            Self::UnparseableInstant(value) => {
                write!(f, "`{value}` is not an RFC 3339 timestamp with offset")
            }
            Self::SubMicrosecondInstant(value) => write!(
                f,
                "`{}` is more precise than one microsecond",
                value.to_rfc3339_opts(SecondsFormat::Nanos, true)
            ),
            Self::MalformedId(value) => write!(f, "`{value}` is not a valid meeting id"),
        }
    }
}

impl Error for MeetingValidationError {}

/// Parses a meeting id from its canonical hyphenated text form.
pub fn parse_meeting_id(value: &str) -> Result<MeetingId, MeetingValidationError> {
    let id = Uuid::parse_str(value.trim())
        .map_err(|_| MeetingValidationError::MalformedId(value.to_string()))?;
    if id.is_nil() {
        return Err(MeetingValidationError::NilId);
    }
    Ok(id)
}

/// One attendee of a meeting. Has no identity of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Participant {
    pub name: String,
    /// Opaque key for conflict checks and participant lookups.
    pub email: String,
    /// Free-form reply status; no behavioral effect.
    pub rsvp: String,
}

impl Participant {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        rsvp: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            rsvp: rsvp.into(),
        }
    }
}

/// Candidate meeting submitted for scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeetingDraft {
    pub title: String,
    pub participants: Vec<Participant>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl MeetingDraft {
    pub fn new(
        title: impl Into<String>,
        participants: Vec<Participant>,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Self {
        Self {
            title: title.into(),
            participants,
            start_time,
            end_time,
        }
    }

    /// Checks the rules the scheduler enforces before touching storage.
    ///
    /// # Errors
    /// - `EmptyParticipants` when nobody is invited.
    /// - `BlankParticipantEmail` when a participant has no usable key.
    /// - `SubMicrosecondInstant` when a bound is finer than a microsecond.
    /// - `InvalidInterval` when `start_time >= end_time`.
    pub fn validate(&self) -> Result<(), MeetingValidationError> {
        validate_participants(&self.participants)?;
        self.time_range().map(|_| ())
    }

    pub fn time_range(&self) -> Result<TimeRange, MeetingValidationError> {
        TimeRange::new(self.start_time, self.end_time)
    }
}

/// Persisted meeting record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub title: String,
    pub participants: Vec<Participant>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Server-assigned insertion time. Never mutated.
    pub created_at: DateTime<Utc>,
}

impl Meeting {
    /// Promotes a candidate to a meeting record with server-assigned fields.
    pub fn from_draft(draft: MeetingDraft, id: MeetingId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            participants: draft.participants,
            start_time: draft.start_time,
            end_time: draft.end_time,
            created_at,
        }
    }

    pub fn validate(&self) -> Result<(), MeetingValidationError> {
        if self.id.is_nil() {
            return Err(MeetingValidationError::NilId);
        }
        validate_participants(&self.participants)?;
        self.time_range().map(|_| ())
    }

    pub fn time_range(&self) -> Result<TimeRange, MeetingValidationError> {
        TimeRange::new(self.start_time, self.end_time)
    }

    /// Participant emails without duplicates, in first-seen order.
    pub fn distinct_emails(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.participants
            .iter()
            .map(|participant| participant.email.as_str())
            .filter(|email| seen.insert(*email))
            .collect()
    }

    pub fn has_participant(&self, email: &str) -> bool {
        self.participants
            .iter()
            .any(|participant| participant.email == email)
    }
}

fn validate_participants(participants: &[Participant]) -> Result<(), MeetingValidationError> {
    if participants.is_empty() {
        return Err(MeetingValidationError::EmptyParticipants);
    }
    if let Some(index) = participants
        .iter()
        .position(|participant| participant.email.trim().is_empty())
    {
        return Err(MeetingValidationError::BlankParticipantEmail { index });
    }
    Ok(())
}
