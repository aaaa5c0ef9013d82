//! # chatter-auth
//!
//! Authentication primitives: JWT encode/decode and Argon2 password
//! hashing. Session identity for the realtime layer is established
//! separately via the `join` signal; this crate only guards the HTTP
//! boundary.

pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use password::PasswordHasher;
