//! # Chat Presence Library
//!
//! This crate provides the core of a two-party chat with:
//! - A durable, totally ordered message log (PostgreSQL or SQLite)
//! - Heartbeat-driven online/offline presence
//! - Live fan-out of messages and presence changes to every session
//! - RESTful HTTP API endpoints and a WebSocket gateway
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Participants, messages, presence records and repository traits
//! - **Application Layer**: Message store, presence tracker, fan-out hub and DTOs
//! - **Infrastructure Layer**: Database backends, repositories and metrics
//! - **Presentation Layer**: HTTP handlers and WebSocket gateway
//!
//! ## Module Structure
//!
//! ```text
//! chat_presence/
//! +-- config/        Configuration management
//! +-- domain/        Domain entities, value objects, and traits
//! +-- application/   Chat services and DTOs
//! +-- infrastructure/ Database, repositories and metrics
//! +-- presentation/  HTTP routes and WebSocket handlers
//! +-- shared/        Common utilities (errors, snowflake IDs)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core types
pub mod domain;

// Application layer - Chat services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
