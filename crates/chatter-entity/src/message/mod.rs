//! Message entity.

pub mod model;

pub use model::{Message, MessageTarget, NewMessage};
