//! # chatter-database
//!
//! PostgreSQL persistence for Chatter: connection pool management,
//! migrations, and one repository per entity. Also provides the
//! `IdentityStore`/`MessageStore` implementations consumed by the
//! realtime core.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod store_impl;

pub use connection::DatabasePool;
