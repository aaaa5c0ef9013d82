//! # chatter-entity
//!
//! Domain models for Chatter: users, groups, and messages, plus the
//! store traits that decouple the realtime core from persistence.

pub mod group;
pub mod message;
pub mod store;
pub mod user;

pub use group::Group;
pub use message::{Message, MessageTarget, NewMessage};
pub use store::{IdentityStore, MessageStore};
pub use user::User;
