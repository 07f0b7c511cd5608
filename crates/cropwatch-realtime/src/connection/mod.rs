//! WebSocket connection management: handles, pool, heartbeat, gateway.

pub mod gateway;
pub mod handle;
pub mod heartbeat;
pub mod pool;

pub use gateway::{ConnectionGateway, OpenConnection, Rejection, Session};
pub use handle::{CloseReason, ConnectionHandle, ConnectionId, ConnectionState, Outbound};
