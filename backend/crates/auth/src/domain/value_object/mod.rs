//! Value Object Module

pub mod account_state;
pub mod page;
pub mod user_name;
pub mod user_password;
