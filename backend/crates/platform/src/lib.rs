//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations with no business meaning:
//! - Password hashing (Argon2id) and the password strength policy
//! - Bearer token header parsing
//! - Random bytes and Base64 helpers

pub mod bearer;
pub mod crypto;
pub mod password;
