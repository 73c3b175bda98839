//! Data Transfer Objects
//!
//! DTOs for API request/response serialization.

pub mod request;
pub mod response;

pub use request::{MessagesQuery, SendMessageRequest};
pub use response::{MessageResponse, PresenceResponse};
