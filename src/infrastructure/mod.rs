//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database pools and migrations (PostgreSQL, SQLite)
//! - Repository implementations
//! - Prometheus metrics

pub mod database;
pub mod metrics;
pub mod repositories;
