//! Meeting store contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the five meeting store operations independent of SQLite.
//! - Scope those operations to a read connection or an exclusive write
//!   transaction.
//!
//! # Invariants
//! - Repository writes validate the meeting before persistence.
//! - Repository APIs distinguish `NotFound` and overlap rejections from
//!   storage transport errors.
//! - The store holds no scheduling logic.

pub mod meeting_repo;
pub mod store;
