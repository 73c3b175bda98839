//! # Domain Layer
//!
//! The domain layer contains the core types of the chat: participants,
//! messages and presence records, plus the repository traits the
//! infrastructure layer implements.
//!
//! ## Structure
//!
//! - **entities**: Participant, Message, PresenceRecord and repository traits
//! - **value_objects**: Immutable value types (Snowflake)

pub mod entities;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use value_objects::*;
