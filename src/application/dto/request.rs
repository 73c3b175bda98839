//! Request DTOs
//!
//! Data structures for API request bodies and query strings.

use serde::Deserialize;
use validator::Validate;

use crate::domain::Snowflake;

/// Send message request
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 64, message = "Sender must be 1-64 characters"))]
    pub sender: String,

    #[validate(
        length(min = 1, max = 4000, message = "Text must be 1-4000 characters"),
        custom(function = "crate::shared::validation::not_blank")
    )]
    pub text: String,
}

/// History query: messages strictly after `after`, or everything.
#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    pub after: Option<Snowflake>,
}
