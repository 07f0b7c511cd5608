//! WebSocket frame types and inbound validation.

pub mod types;
pub mod validator;

pub use types::{GroupEvent, InboundMessage, OutboundMessage};
