//! WebSocket Gateway
//!
//! Real-time delivery of messages and presence over WebSocket connections.

pub mod handler;
pub mod messages;
pub mod session;

pub use handler::ws_handler;
pub use messages::{ClientFrame, ServerFrame};
pub use session::{CloseReason, InboundFrame, Session, SessionContext, SessionState};
