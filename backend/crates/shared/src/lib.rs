//! Shared Kernel
//!
//! Vocabulary every backend crate agrees on:
//! - The uniform [`error::app_error::AppError`] and its [`error::kind::ErrorKind`]
//! - Typed identifiers ([`id::Id`]) for accounts and roles
//!
//! Only things that mean the same in every bounded context belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
