//! Application Services
//!
//! The chat core:
//! - **MessageStore** - append-only message log
//! - **PresenceTracker** - heartbeat-driven online/offline state
//! - **FanoutHub** - ordered live delivery to every connected session

pub mod fanout_hub;
pub mod message_store;
pub mod presence_tracker;

pub use fanout_hub::{Delivery, FanoutHub, HubEnvelope, HubEvent, Subscription};
pub use message_store::MessageStore;
pub use presence_tracker::PresenceTracker;
