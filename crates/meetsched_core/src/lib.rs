//! Core domain logic for meeting scheduling.
//! This crate is the single source of truth for the no-double-booking rule.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod runtime;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{DbError, DbPool, PoolOptions};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::meeting::{
    parse_meeting_id, Meeting, MeetingDraft, MeetingId, MeetingValidationError, Participant,
};
pub use model::time_range::{parse_timestamp, TimeRange, Timestamp};
pub use repo::meeting_repo::{MeetingRepository, RepoError, RepoResult, SqliteMeetingRepository};
pub use repo::store::{MeetingStore, SqliteMeetingStore};
pub use runtime::MeetingRuntime;
pub use service::query_service::MeetingQueryService;
pub use service::scheduling_service::{
    ConflictDetails, ErrorKind, SchedulingService, ServiceError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
