//! Half-open time intervals.
//!
//! # Responsibility
//! - Parse instants from their canonical RFC 3339 wire form.
//! - Answer overlap and strict-containment questions between intervals.
//!
//! # Invariants
//! - A `TimeRange` always has `start < end`.
//! - Comparisons use absolute instants; offsets only affect display.
//! - Instants carry at most microsecond precision, matching what storage
//!   compares.

use crate::model::meeting::MeetingValidationError;
use chrono::{DateTime, FixedOffset, Timelike};

/// Canonical instant: a point in time plus the offset it was written with.
pub type Timestamp = DateTime<FixedOffset>;

/// Parses one RFC 3339 timestamp with an explicit offset (`Z` or `+hh:mm`).
///
/// Fractions finer than a microsecond are rejected.
pub fn parse_timestamp(value: &str) -> Result<Timestamp, MeetingValidationError> {
    let parsed = DateTime::parse_from_rfc3339(value.trim())
        .map_err(|_| MeetingValidationError::UnparseableInstant(value.to_string()))?;
    ensure_microsecond_precision(parsed)?;
    Ok(parsed)
}

/// Rejects instants with a non-zero sub-microsecond part.
fn ensure_microsecond_precision(value: Timestamp) -> Result<(), MeetingValidationError> {
    if value.nanosecond() % 1_000 != 0 {
        return Err(MeetingValidationError::SubMicrosecondInstant(value));
    }
    Ok(())
}

/// Validated half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: Timestamp,
    end: Timestamp,
}

impl TimeRange {
    /// Builds an interval, rejecting empty and reversed ranges and bounds
    /// finer than a microsecond.
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, MeetingValidationError> {
        ensure_microsecond_precision(start)?;
        ensure_microsecond_precision(end)?;
        if start >= end {
            return Err(MeetingValidationError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    /// Returns whether two half-open intervals share at least one instant.
    ///
    /// A conflict can be described as the union of three relations between an
    /// existing range `e` and a candidate `c`:
    /// (a) `e.start <= c.start && c.start < e.end`,
    /// (b) `e.start < c.end && c.end <= e.end`,
    /// (c) `c.start <= e.start && e.end <= c.end`.
    /// Each relation implies `e.start < c.end && c.start < e.end` (using
    /// `start < end` on both sides). Conversely, if that conjunction holds then
    /// either `e.start <= c.start` (giving a) or `c.start < e.start`; in the
    /// latter case either `e.end <= c.end` (giving c) or `c.end < e.end`
    /// (giving b). The single predicate below is therefore exact, and
    /// back-to-back ranges (`e.end == c.start`) never overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns whether `other` lies strictly inside this range, touching
    /// neither bound.
    pub fn strictly_contains(&self, other: &TimeRange) -> bool {
        self.start < other.start && other.end < self.end
    }
}
