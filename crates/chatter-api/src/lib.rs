//! # chatter-api
//!
//! HTTP API layer for Chatter built on Axum.
//!
//! Provides the REST endpoints for accounts, contacts, groups, and message
//! history, the WebSocket upgrade into the realtime engine, DTOs, and
//! error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
