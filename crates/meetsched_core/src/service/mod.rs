//! Core use-case services.
//!
//! # Responsibility
//! - Admit new meetings under the no-double-booking rule.
//! - Serve read queries straight from the store.
//! - Translate repository failures into the four caller-facing error kinds.

pub mod query_service;
pub mod scheduling_service;
