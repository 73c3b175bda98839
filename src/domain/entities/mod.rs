//! # Domain Entities
//!
//! Core domain entities of the chat core. Persistent entities map directly
//! to their database tables.
//!
//! - **Participant**: one of the two fixed chat identities
//! - **Message**: an immutable entry of the message log
//! - **PresenceRecord**: online/offline state of a participant
//!
//! Each persistent entity has an associated repository trait defining data
//! access operations. These traits are implemented in the infrastructure
//! layer.

mod message;
mod participant;
mod presence;

pub use message::{Message, MessageRepository};
pub use participant::{Participant, Participants};
pub use presence::{PresenceRecord, PresenceRepository, PresenceStatus};

#[cfg(test)]
pub use message::MockMessageRepository;
#[cfg(test)]
pub use presence::MockPresenceRepository;
