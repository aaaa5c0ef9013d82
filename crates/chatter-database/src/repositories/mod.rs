//! Entity repositories.

pub mod group;
pub mod message;
pub mod user;

pub use group::GroupRepository;
pub use message::MessageRepository;
pub use user::UserRepository;
