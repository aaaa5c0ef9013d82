//! # chatter-realtime
//!
//! The presence-and-delivery core. Tracks which users are reachable and at
//! which connection, fans out messages and typing signals to exactly the
//! connections that should see them, and manages per-connection group
//! channel membership.
//!
//! Persistence is consumed through the [`chatter_entity::store`] traits so
//! the whole engine can run against in-memory fakes in tests.

pub mod channel;
pub mod connection;
pub mod engine;
pub mod presence;
pub mod router;
pub mod signal;
pub mod typing;

pub use connection::handle::{ConnectionHandle, ConnectionId};
pub use engine::ChatEngine;
pub use signal::{ClientSignal, ServerSignal};
