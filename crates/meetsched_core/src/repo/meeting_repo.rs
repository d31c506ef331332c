//! Meeting repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist meetings and their participants.
//! - Answer id, participant, window-containment and overlap queries.
//!
//! # Invariants
//! - Inserts are all-or-nothing, even outside an explicit transaction.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - Window queries use strict containment; conflict queries use half-open
//!   overlap. The two never share a predicate.

use crate::db::DbError;
use crate::model::meeting::{Meeting, MeetingId, MeetingValidationError, Participant};
use crate::model::time_range::{TimeRange, Timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, Params, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const MEETING_SELECT_SQL: &str = "SELECT
    m.uuid,
    m.title,
    m.start_at,
    m.end_at,
    m.created_at
FROM meetings AS m";

const MEETING_ORDER_SQL: &str = "ORDER BY m.start_us ASC, m.uuid ASC";

/// Message raised by the `meeting_participants_no_overlap` trigger.
const OVERLAP_TRIGGER_MESSAGE: &str = "meeting_overlap";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for meeting persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(MeetingValidationError),
    Db(DbError),
    NotFound(MeetingId),
    /// The write-time overlap constraint rejected an insert.
    Overlap(MeetingId),
    InvalidData(String),
}

impl RepoError {
    /// Returns whether a bounded storage wait expired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_timeout())
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "meeting not found: {id}"),
            Self::Overlap(id) => write!(
                f,
                "meeting {id} overlaps an existing meeting of one of its participants"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted meeting data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::Overlap(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<MeetingValidationError> for RepoError {
    fn from(value: MeetingValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Meeting store operations.
///
/// List results carry no ordering guarantee for callers; the SQLite
/// implementation happens to sort by start instant.
pub trait MeetingRepository {
    /// Persists a meeting that the caller already cleared of conflicts.
    fn insert_meeting(&self, meeting: &Meeting) -> RepoResult<MeetingId>;
    /// Loads one meeting, failing with `RepoError::NotFound` when absent.
    fn get_meeting(&self, id: MeetingId) -> RepoResult<Meeting>;
    /// Meetings with a participant whose email equals `email` exactly.
    fn list_by_participant(&self, email: &str) -> RepoResult<Vec<Meeting>>;
    /// Meetings lying strictly inside `window`.
    fn list_within_window(&self, window: &TimeRange) -> RepoResult<Vec<Meeting>>;
    /// Meetings of `email` whose half-open interval overlaps `range`.
    fn find_conflicts(&self, email: &str, range: &TimeRange) -> RepoResult<Vec<Meeting>>;
}

/// SQLite-backed meeting repository bound to one connection.
pub struct SqliteMeetingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMeetingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn insert_rows(&self, meeting: &Meeting, range: &TimeRange) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO meetings (
                uuid,
                title,
                start_at,
                end_at,
                start_us,
                end_us,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                meeting.id.to_string(),
                meeting.title.as_str(),
                meeting.start_time.to_rfc3339(),
                meeting.end_time.to_rfc3339(),
                range.start().timestamp_micros(),
                range.end().timestamp_micros(),
                meeting.created_at.to_rfc3339(),
            ],
        )?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO meeting_participants (meeting_uuid, position, name, email, rsvp)
             VALUES (?1, ?2, ?3, ?4, ?5);",
        )?;
        for (position, participant) in meeting.participants.iter().enumerate() {
            let position = i64::try_from(position).map_err(|_| {
                RepoError::InvalidData(format!("participant position {position} overflows"))
            })?;
            stmt.execute(params![
                meeting.id.to_string(),
                position,
                participant.name.as_str(),
                participant.email.as_str(),
                participant.rsvp.as_str(),
            ])
            .map_err(|err| map_participant_insert_error(err, meeting.id))?;
        }

        Ok(())
    }

    fn query_meetings<P: Params>(&self, filter_sql: &str, params: P) -> RepoResult<Vec<Meeting>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEETING_SELECT_SQL} {filter_sql} {MEETING_ORDER_SQL};"))?;
        let mut rows = stmt.query(params)?;
        let mut meetings = Vec::new();

        while let Some(row) = rows.next()? {
            meetings.push(self.parse_meeting_row(row)?);
        }

        Ok(meetings)
    }

    fn load_participants(&self, meeting_uuid: &str) -> RepoResult<Vec<Participant>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT name, email, rsvp
             FROM meeting_participants
             WHERE meeting_uuid = ?1
             ORDER BY position ASC;",
        )?;
        let participants = stmt
            .query_map([meeting_uuid], |row| {
                Ok(Participant {
                    name: row.get("name")?,
                    email: row.get("email")?,
                    rsvp: row.get("rsvp")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(participants)
    }

    fn parse_meeting_row(&self, row: &Row<'_>) -> RepoResult<Meeting> {
        let uuid_text: String = row.get("uuid")?;
        let id = Uuid::parse_str(&uuid_text).map_err(|_| {
            RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in meetings.uuid"))
        })?;

        let meeting = Meeting {
            id,
            title: row.get("title")?,
            participants: self.load_participants(&uuid_text)?,
            start_time: parse_stored_instant(row, "start_at")?,
            end_time: parse_stored_instant(row, "end_at")?,
            created_at: parse_stored_instant(row, "created_at")?.with_timezone(&Utc),
        };
        meeting.validate().map_err(|err| {
            RepoError::InvalidData(format!("meeting {id} failed validation: {err}"))
        })?;
        Ok(meeting)
    }
}

impl MeetingRepository for SqliteMeetingRepository<'_> {
    fn insert_meeting(&self, meeting: &Meeting) -> RepoResult<MeetingId> {
        meeting.validate()?;
        let range = meeting.time_range()?;

        // A savepoint nests inside the caller's transaction when there is one
        // and still keeps the meeting row and its participants together.
        self.conn.execute_batch("SAVEPOINT meeting_insert;")?;
        match self.insert_rows(meeting, &range) {
            Ok(()) => {
                self.conn.execute_batch("RELEASE meeting_insert;")?;
                Ok(meeting.id)
            }
            Err(err) => {
                self.conn
                    .execute_batch("ROLLBACK TO meeting_insert; RELEASE meeting_insert;")?;
                Err(err)
            }
        }
    }

    fn get_meeting(&self, id: MeetingId) -> RepoResult<Meeting> {
        self.query_meetings("WHERE m.uuid = ?1", [id.to_string()])?
            .into_iter()
            .next()
            .ok_or(RepoError::NotFound(id))
    }

    fn list_by_participant(&self, email: &str) -> RepoResult<Vec<Meeting>> {
        self.query_meetings(
            "WHERE m.uuid IN (
                SELECT p.meeting_uuid FROM meeting_participants AS p WHERE p.email = ?1
            )",
            [email],
        )
    }

    fn list_within_window(&self, window: &TimeRange) -> RepoResult<Vec<Meeting>> {
        self.query_meetings(
            "WHERE m.start_us > ?1 AND m.end_us < ?2",
            params![window.start().timestamp_micros(), window.end().timestamp_micros()],
        )
    }

    fn find_conflicts(&self, email: &str, range: &TimeRange) -> RepoResult<Vec<Meeting>> {
        self.query_meetings(
            "WHERE m.start_us < ?3
               AND ?2 < m.end_us
               AND m.uuid IN (
                   SELECT p.meeting_uuid FROM meeting_participants AS p WHERE p.email = ?1
               )",
            params![
                email,
                range.start().timestamp_micros(),
                range.end().timestamp_micros()
            ],
        )
    }
}

fn parse_stored_instant(row: &Row<'_>, column: &str) -> RepoResult<Timestamp> {
    let text: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&text).map_err(|_| {
        RepoError::InvalidData(format!("invalid timestamp `{text}` in meetings.{column}"))
    })
}

fn map_participant_insert_error(err: rusqlite::Error, meeting_id: MeetingId) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.code == ErrorCode::ConstraintViolation
                && message.contains(OVERLAP_TRIGGER_MESSAGE) =>
        {
            RepoError::Overlap(meeting_id)
        }
        _ => RepoError::from(err),
    }
}
