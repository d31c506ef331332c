//! Meeting domain model.
//!
//! # Responsibility
//! - Define the meeting record protected by the no-double-booking rule.
//! - Provide the half-open interval type shared by conflict and window queries.
//!
//! # Invariants
//! - Every persisted meeting is identified by a non-nil `MeetingId`.
//! - Every meeting interval satisfies `start_time < end_time`.

pub mod meeting;
pub mod time_range;
