//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! - **Snowflake**: time-sortable unique message ID

mod snowflake;

pub use snowflake::*;
