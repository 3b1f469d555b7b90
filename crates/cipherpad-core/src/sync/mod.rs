//! Real-time propagation of local edits over a persistent duplex connection.

mod channel;
mod connector;
mod message;

pub use channel::{ConnectionState, Delivery, SyncChannel};
pub use connector::{Connector, Link, WsConnector};
pub use message::{Outgoing, SyncMessage};
